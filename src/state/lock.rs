//! Advisory locking of the state file.
//!
//! Two CLI runs against the same state file would each load, change and save
//! it. The lock record makes the second run fail fast instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds after which an abandoned lock may be taken over.
pub const LOCK_EXPIRY_SECS: i64 = 300;

/// The record stored in `state.lock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Random id; only this id releases the lock.
    pub lock_id: String,
    /// `host-pid-nonce` of the process that took it.
    pub holder: String,
    /// Command holding the lock, e.g. `apply`.
    #[serde(default)]
    pub operation: String,
    /// When the lock was taken.
    pub acquired_at: DateTime<Utc>,
    /// When other runs may take it over.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// A fresh lock for `holder` running `operation`.
    #[must_use]
    pub fn new(holder: &str, operation: &str) -> Self {
        let acquired_at = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            operation: operation.to_string(),
            acquired_at,
            expires_at: renewed_until(acquired_at),
        }
    }

    /// Whether a crashed or stuck run left this lock behind.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Whole seconds left before expiry, zero once expired.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

fn renewed_until(from: DateTime<Utc>) -> DateTime<Utc> {
    from + chrono::Duration::seconds(LOCK_EXPIRY_SECS)
}

/// Identifies this process as `host-pid-nonce`.
#[must_use]
pub fn generate_holder_id() -> String {
    let host = hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().into_owned());
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{host}-{}-{}", std::process::id(), &nonce[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_creation() {
        let lock = LockInfo::new("test-holder", "apply");
        assert_eq!(lock.holder, "test-holder");
        assert_eq!(lock.operation, "apply");
        assert!(!lock.is_expired());
        assert!(lock.remaining_secs() > 0);
    }

    #[test]
    fn test_expired_lock() {
        let mut lock = LockInfo::new("test-holder", "apply");
        lock.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(lock.is_expired());
        assert_eq!(lock.remaining_secs(), 0);
    }

    #[test]
    fn test_holder_id_generation() {
        let id1 = generate_holder_id();
        let id2 = generate_holder_id();

        assert_ne!(id1, id2);
        assert!(id1.contains(&std::process::id().to_string()));
    }
}
