//! State kept as a pretty-printed JSON file, with `state.lock` beside it.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{Result, StateError};

use super::lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
use super::store::StateStore;
use super::types::{ProviderState, STATE_VERSION};

const LOCK_FILE: &str = "state.lock";

/// [`StateStore`] backed by the local filesystem.
#[derive(Debug)]
pub struct LocalStateStore {
    base_dir: PathBuf,
    state_path: PathBuf,
    lock_path: PathBuf,
}

/// Reads and parses a JSON file, or `None` when it does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| StateError::corrupted(format!("Failed to read {what}: {e}")))?;
    let value = serde_json::from_str(&content)
        .map_err(|e| StateError::corrupted(format!("Failed to parse {what}: {e}")))?;
    Ok(Some(value))
}

/// Serializes `value` and writes it to `path`, synced to disk.
async fn write_json<T: Serialize + Sync>(
    path: &Path,
    value: &T,
    on_error: fn(String) -> StateError,
) -> Result<()> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| StateError::serialization(e.to_string()))?;
    let failed = |e: std::io::Error| on_error(format!("{}: {e}", path.display()));

    let mut file = fs::File::create(path).await.map_err(failed)?;
    file.write_all(content.as_bytes()).await.map_err(failed)?;
    file.sync_all().await.map_err(failed)?;
    Ok(())
}

/// Major component of a `major.minor` version string.
fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

impl LocalStateStore {
    /// Creates a store for `state_path`; the lock file lives in the same
    /// directory.
    #[must_use]
    pub fn with_state_path(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let base_dir = state_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let lock_path = base_dir.join(LOCK_FILE);

        Self {
            base_dir,
            state_path,
            lock_path,
        }
    }

    /// Path of the state file.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating state directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir)
                .await
                .map_err(|e| StateError::write(format!("Failed to create state directory: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<ProviderState>> {
        let Some(state) = read_json::<ProviderState>(&self.state_path, "state file").await? else {
            debug!("No state file at {}", self.state_path.display());
            return Ok(None);
        };
        info!("Loaded state from: {}", self.state_path.display());

        if major_version(&state.version) != major_version(STATE_VERSION) {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: state.version,
            }
            .into());
        }
        Ok(Some(state))
    }

    async fn save(&self, state: &ProviderState) -> Result<()> {
        self.ensure_dir().await?;
        info!("Saving state to: {}", self.state_path.display());

        // Written beside the target and renamed over it
        let temp_path = self.state_path.with_extension("tmp");
        write_json(&temp_path, state, StateError::write).await?;
        fs::rename(&temp_path, &self.state_path)
            .await
            .map_err(|e| StateError::write(e.to_string()))?;
        Ok(())
    }

    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo> {
        if let Some(existing) = self.get_lock_info().await? {
            if !existing.is_expired() {
                return Err(StateError::LockedByOther {
                    holder: existing.holder,
                    since: existing.acquired_at.to_rfc3339(),
                }
                .into());
            }
            warn!("Taking over expired lock held by {}", existing.holder);
        }

        let holder_id = if holder.is_empty() {
            generate_holder_id()
        } else {
            holder.to_string()
        };
        let lock = LockInfo::new(&holder_id, operation);

        self.ensure_dir().await?;
        write_json(&self.lock_path, &lock, StateError::lock_failed).await?;
        debug!("Acquired state lock {} for {LOCK_EXPIRY_SECS}s", lock.lock_id);
        Ok(lock)
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        match self.get_lock_info().await? {
            Some(existing) if existing.lock_id == lock_id => {
                fs::remove_file(&self.lock_path)
                    .await
                    .map_err(|e| StateError::lock_failed(format!("Failed to delete lock file: {e}")))?;
                debug!("Released state lock: {lock_id}");
            }
            Some(existing) => debug!("Lock {lock_id} not released, held as {}", existing.lock_id),
            None => {}
        }
        Ok(())
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        read_json(&self.lock_path, "lock file").await
    }
}
