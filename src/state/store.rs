//! The seam between the reconciler and wherever state is kept.

use async_trait::async_trait;

use super::lock::LockInfo;
use super::types::ProviderState;
use crate::error::Result;

/// Persistent storage for [`ProviderState`] with an advisory lock.
///
/// Every mutating command takes the lock, loads, saves and releases, so
/// implementations only need single-writer semantics per lock holder.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the recorded state, or `None` before the first save.
    async fn load(&self) -> Result<Option<ProviderState>>;

    /// Replaces the recorded state.
    async fn save(&self, state: &ProviderState) -> Result<()>;

    /// Takes the lock for `operation`. An empty `holder` gets a generated id.
    ///
    /// Fails with `StateError::LockedByOther` while an unexpired lock exists.
    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo>;

    /// Releases the lock if `lock_id` still owns it.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Current lock record, expired or not.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Whether an unexpired lock is held.
    async fn is_locked(&self) -> Result<bool> {
        Ok(self.get_lock_info().await?.is_some_and(|lock| !lock.is_expired()))
    }
}
