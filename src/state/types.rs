//! State types for tracking managed resources.
//!
//! These types record what was last applied to, or read from, the
//! workspace. The planner diffs configuration against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resources::ResourceKind;
use crate::schema::ResourceData;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Number of history entries kept in the state file.
const MAX_HISTORY: usize = 100;

/// The complete provider state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderState {
    /// State format version.
    pub version: String,
    /// Workspace the resources live in.
    pub workspace: String,
    /// Hash of the last applied configuration.
    pub config_hash: String,
    /// Managed resources by configured name.
    pub resources: BTreeMap<String, ResourceState>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Operation history (recent entries).
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// State of a single managed resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Configured name.
    pub name: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Identity and fields as last reconciled.
    pub data: ResourceData,
    /// Hash of the resource configuration when applied.
    pub config_hash: String,
    /// Current status.
    pub status: ResourceStatus,
    /// When the resource was created or imported.
    pub created_at: DateTime<Utc>,
    /// When the resource was last written.
    pub updated_at: DateTime<Utc>,
}

/// Status of a managed resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// Matches the last apply.
    Ready,
    /// Created remotely but a later step failed; replaced on next apply.
    Tainted,
}

/// A single entry in the operation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the operation ran.
    pub timestamp: DateTime<Utc>,
    /// Type of operation.
    pub operation: Operation,
    /// Configuration hash at the time.
    pub config_hash: String,
    /// Resources affected.
    pub resources: Vec<String>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Optional error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Types of state-changing operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Plan execution.
    Apply,
    /// Refresh from the workspace.
    Refresh,
    /// Import of an existing entity.
    Import,
    /// Destruction of all resources.
    Destroy,
}

impl ProviderState {
    /// Creates a new empty state.
    #[must_use]
    pub fn new(workspace: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            workspace: workspace.to_string(),
            config_hash: String::new(),
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Gets a resource by name.
    #[must_use]
    pub fn get_resource(&self, name: &str) -> Option<&ResourceState> {
        self.resources.get(name)
    }

    /// Gets a mutable reference to a resource by name.
    pub fn get_resource_mut(&mut self, name: &str) -> Option<&mut ResourceState> {
        self.resources.get_mut(name)
    }

    /// Adds or updates a resource.
    pub fn set_resource(&mut self, resource: ResourceState) {
        self.resources.insert(resource.name.clone(), resource);
        self.last_updated = Utc::now();
    }

    /// Removes a resource by name.
    pub fn remove_resource(&mut self, name: &str) -> Option<ResourceState> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.last_updated = Utc::now();
        }
        result
    }

    /// Adds a history entry, dropping the oldest past the limit.
    pub fn add_history(&mut self, entry: HistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }

    /// Returns all resource names.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Returns the number of resources of a kind.
    #[must_use]
    pub fn count_kind(&self, kind: ResourceKind) -> usize {
        self.resources.values().filter(|r| r.kind == kind).count()
    }
}

impl ResourceState {
    /// Creates a ready resource state.
    #[must_use]
    pub fn new(name: &str, kind: ResourceKind, data: ResourceData, config_hash: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            kind,
            data,
            config_hash: config_hash.to_string(),
            status: ResourceStatus::Ready,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remote identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.data.id()
    }

    /// Replaces the recorded fields.
    pub fn set_data(&mut self, data: ResourceData) {
        self.data = data;
        self.updated_at = Utc::now();
    }

    /// Updates the status.
    pub fn set_status(&mut self, status: ResourceStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Returns true if the resource must be replaced.
    #[must_use]
    pub const fn is_tainted(&self) -> bool {
        matches!(self.status, ResourceStatus::Tainted)
    }
}

impl HistoryEntry {
    /// Creates a new history entry.
    #[must_use]
    pub fn new(operation: Operation, config_hash: &str, resources: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            config_hash: config_hash.to_string(),
            resources,
            success: true,
            error: None,
        }
    }

    /// Creates a failed history entry.
    #[must_use]
    pub fn failed(operation: Operation, config_hash: &str, resources: Vec<String>, error: &str) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::new(operation, config_hash, resources)
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Ready => "ready",
            Self::Tainted => "tainted",
        };
        write!(f, "{status}")
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Apply => "apply",
            Self::Refresh => "refresh",
            Self::Import => "import",
            Self::Destroy => "destroy",
        };
        write!(f, "{op}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_remove_resource() {
        let mut state = ProviderState::new("https://example.cloud.turbot.com");
        let data = ResourceData::with_id("204817");
        state.set_resource(ResourceState::new("readme", ResourceKind::File, data, "abc"));

        assert_eq!(state.get_resource("readme").map(ResourceState::id), Some("204817"));
        assert_eq!(state.count_kind(ResourceKind::File), 1);
        assert!(state.remove_resource("readme").is_some());
        assert!(state.resource_names().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = ProviderState::new("w");
        for _ in 0..(MAX_HISTORY + 5) {
            state.add_history(HistoryEntry::new(Operation::Apply, "h", vec![]));
        }
        assert_eq!(state.history.len(), MAX_HISTORY);
    }

    #[test]
    fn test_failed_entry() {
        let entry = HistoryEntry::failed(Operation::Destroy, "h", vec![String::from("a")], "boom");
        assert!(!entry.success);
        assert_eq!(entry.error.as_deref(), Some("boom"));
        assert_eq!(entry.operation.to_string(), "destroy");
    }

    #[test]
    fn test_state_json_round_trip_keeps_fields() {
        let mut data = ResourceData::with_id("171930_204817");
        data.set("resource_akas", vec![String::from("arn:aws:s3:::bucket")]);
        let mut state = ProviderState::new("w");
        state.set_resource(ResourceState::new(
            "baseline",
            ResourceKind::SmartFolderAttachment,
            data,
            "h",
        ));

        let json = serde_json::to_string(&state).unwrap();
        let loaded: ProviderState = serde_json::from_str(&json).unwrap();
        let resource = loaded.get_resource("baseline").unwrap();
        assert_eq!(resource.id(), "171930_204817");
        assert_eq!(resource.data.get_list("resource_akas"), ["arn:aws:s3:::bucket"]);
        assert_eq!(resource.kind, ResourceKind::SmartFolderAttachment);
    }
}
