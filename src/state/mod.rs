//! State management module for the Turbot provider.
//!
//! This module provides persistent state storage for tracking managed
//! resources: their remote identity, reconciled fields and the configuration
//! hash they were applied with.

mod store;
mod local;
mod lock;
mod types;

pub use store::StateStore;
pub use local::LocalStateStore;
pub use lock::{LOCK_EXPIRY_SECS, LockInfo, generate_holder_id};
pub use types::{HistoryEntry, Operation, ProviderState, ResourceState, ResourceStatus, STATE_VERSION};
