//! Diff engine for comparing configuration with recorded state.
//!
//! Fields are compared through each kind's schema: aka suppression lets a
//! configured aka match a stored id, and JSON documents compare in canonical
//! form. Unconfigured optional fields are not diffed.

use std::collections::BTreeSet;
use tracing::debug;

use crate::config::{ConfigHasher, ProviderConfig, ResourceConfig};
use crate::schema::{FieldMode, FieldValue};
use crate::state::{ProviderState, ResourceState};

/// Engine for computing diffs between configuration and state.
#[derive(Debug, Default)]
pub struct DiffEngine {
    /// Configuration hasher.
    hasher: ConfigHasher,
}

/// Difference for a single resource.
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// Resource name.
    pub name: String,
    /// Type of difference.
    pub diff_type: DiffType,
    /// Field-level differences.
    pub details: Vec<DiffDetail>,
    /// Hash recorded in state (if any).
    pub old_hash: Option<String>,
    /// Hash of the configuration (if any).
    pub new_hash: Option<String>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Resource needs to be created.
    Create,
    /// Resource can be updated in place.
    Update,
    /// Resource must be deleted and created again.
    Replace,
    /// Resource needs to be deleted.
    Delete,
    /// Resource is unchanged.
    NoChange,
}

/// Detail about a specific difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffDetail {
    /// Field that differs.
    pub field: String,
    /// Recorded value.
    pub old_value: Option<String>,
    /// Configured value.
    pub new_value: Option<String>,
    /// Whether this change forces replacement.
    pub forces_replacement: bool,
}

/// Complete diff result.
#[derive(Debug)]
pub struct DiffResult {
    /// All resource diffs.
    pub diffs: Vec<ResourceDiff>,
    /// Number of resources to create.
    pub creates: usize,
    /// Number of resources to update in place.
    pub updates: usize,
    /// Number of resources to replace.
    pub replaces: usize,
    /// Number of resources to delete.
    pub deletes: usize,
    /// Number of unchanged resources.
    pub unchanged: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: ConfigHasher::new(),
        }
    }

    /// Computes the diff between configuration and recorded state.
    #[must_use]
    pub fn compute_diff(&self, config: &ProviderConfig, state: Option<&ProviderState>) -> DiffResult {
        let mut diffs = Vec::new();

        for resource in &config.resources {
            let new_hash = self.hasher.hash_resource(resource);
            let recorded = state.and_then(|s| s.get_resource(&resource.name));
            diffs.push(Self::compute_resource_diff(resource, recorded, new_hash));
        }

        let configured: BTreeSet<&str> = config.resources.iter().map(|r| r.name.as_str()).collect();
        if let Some(state) = state {
            for (name, recorded) in &state.resources {
                if !configured.contains(name.as_str()) {
                    debug!("Resource {name} removed from configuration");
                    diffs.push(ResourceDiff {
                        name: name.clone(),
                        diff_type: DiffType::Delete,
                        details: vec![DiffDetail {
                            field: String::from("id"),
                            old_value: Some(recorded.id().to_string()),
                            new_value: None,
                            forces_replacement: false,
                        }],
                        old_hash: Some(recorded.config_hash.clone()),
                        new_hash: None,
                    });
                }
            }
        }

        let count = |t: DiffType| diffs.iter().filter(|d| d.diff_type == t).count();
        DiffResult {
            creates: count(DiffType::Create),
            updates: count(DiffType::Update),
            replaces: count(DiffType::Replace),
            deletes: count(DiffType::Delete),
            unchanged: count(DiffType::NoChange),
            diffs,
        }
    }

    fn compute_resource_diff(
        resource: &ResourceConfig,
        recorded: Option<&ResourceState>,
        new_hash: String,
    ) -> ResourceDiff {
        let Some(recorded) = recorded.filter(|r| !r.id().is_empty()) else {
            debug!("Resource {} needs to be created", resource.name);
            return ResourceDiff {
                name: resource.name.clone(),
                diff_type: DiffType::Create,
                details: vec![],
                old_hash: None,
                new_hash: Some(new_hash),
            };
        };

        let mut details = Vec::new();
        if recorded.kind != resource.kind {
            details.push(DiffDetail {
                field: String::from("kind"),
                old_value: Some(recorded.kind.to_string()),
                new_value: Some(resource.kind.to_string()),
                forces_replacement: true,
            });
        } else {
            details = Self::compute_field_diffs(resource, recorded);
        }
        if recorded.is_tainted() {
            details.push(DiffDetail {
                field: String::from("status"),
                old_value: Some(recorded.status.to_string()),
                new_value: None,
                forces_replacement: true,
            });
        }

        let schema = resource.kind.schema();
        let diff_type = if details.is_empty() {
            DiffType::NoChange
        } else if !schema.updatable || details.iter().any(|d| d.forces_replacement) {
            DiffType::Replace
        } else {
            DiffType::Update
        };

        debug!("Resource {}: {diff_type}", resource.name);
        ResourceDiff {
            name: resource.name.clone(),
            diff_type,
            details,
            old_hash: Some(recorded.config_hash.clone()),
            new_hash: Some(new_hash),
        }
    }

    /// Compares every configurable field. `recorded.data` supplies the aka
    /// lists used by suppression.
    fn compute_field_diffs(resource: &ResourceConfig, recorded: &ResourceState) -> Vec<DiffDetail> {
        let schema = resource.kind.schema();
        let mut details = Vec::new();

        for field in schema.fields.iter().filter(|f| f.mode != FieldMode::Computed) {
            let Some(desired) = resource.fields.get(field.name).filter(|v| !v.is_empty()) else {
                continue;
            };
            let current = recorded.data.get_ok(field.name);

            let same = match (current, desired) {
                (Some(FieldValue::String(old)), FieldValue::String(new)) => {
                    old == new || field.suppresses(old, new, &recorded.data)
                }
                (None, FieldValue::String(new)) => field.suppresses("", new, &recorded.data),
                (Some(old), new) => old == new,
                (None, _) => false,
            };

            if !same {
                details.push(DiffDetail {
                    field: field.name.to_string(),
                    old_value: current.map(FieldValue::display),
                    new_value: Some(desired.display()),
                    forces_replacement: field.force_new,
                });
            }
        }

        details
    }
}

impl DiffResult {
    /// Returns true if there are any changes.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Returns the total number of changes.
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.creates + self.updates + self.replaces + self.deletes
    }

    /// Filters to only diffs that require action.
    #[must_use]
    pub fn actionable_diffs(&self) -> Vec<&ResourceDiff> {
        self.diffs
            .iter()
            .filter(|d| d.diff_type != DiffType::NoChange)
            .collect()
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.diff_type)?;
        if !self.details.is_empty() {
            write!(f, " (")?;
            for (i, detail) in self.details.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", detail.field)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;
    use crate::resources::ResourceKind;
    use crate::schema::ResourceData;
    use crate::state::ResourceStatus;

    fn config() -> ProviderConfig {
        ConfigParser::new()
            .parse_yaml(
                r#"
resources:
  - name: readme
    kind: file
    fields:
      parent: "tmod:@turbot/turbot#/"
      title: Readme
      data: '{"b": 2, "a": 1}'
  - name: ops-admin
    kind: grant
    fields:
      resource: "tmod:@turbot/turbot#/"
      identity: "profile-1"
      type: "tmod:@turbot/aws#/permission/types/aws"
      level: "tmod:@turbot/turbot-iam#/permission/levels/superuser"
"#,
                None,
            )
            .unwrap()
    }

    fn recorded_file() -> ResourceState {
        let mut data = ResourceData::with_id("204817");
        data.set("parent", "171930");
        data.set("parent_akas", vec![String::from("tmod:@turbot/turbot#/")]);
        data.set("title", "Readme");
        data.set("data", r#"{"a":1,"b":2}"#);
        ResourceState::new("readme", ResourceKind::File, data, "h")
    }

    fn recorded_grant(level: &str) -> ResourceState {
        let mut data = ResourceData::with_id("300001");
        data.set("resource", "171930");
        data.set("resource_akas", vec![String::from("tmod:@turbot/turbot#/")]);
        data.set("identity", "profile-1");
        data.set("type", "11");
        data.set("permission_type_akas", vec![String::from("tmod:@turbot/aws#/permission/types/aws")]);
        data.set("level", level);
        data.set(
            "permission_level_akas",
            vec![String::from("tmod:@turbot/turbot-iam#/permission/levels/superuser")],
        );
        ResourceState::new("ops-admin", ResourceKind::Grant, data, "h")
    }

    #[test]
    fn test_empty_state_creates_everything() {
        let result = DiffEngine::new().compute_diff(&config(), None);
        assert_eq!(result.creates, 2);
        assert!(result.has_changes());
    }

    #[test]
    fn test_akas_and_canonical_json_suppress_diffs() {
        let mut state = ProviderState::new("w");
        state.set_resource(recorded_file());
        state.set_resource(recorded_grant("12"));

        let result = DiffEngine::new().compute_diff(&config(), Some(&state));
        assert_eq!(result.unchanged, 2, "{:?}", result.diffs);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_changed_file_title_updates_in_place() {
        let mut state = ProviderState::new("w");
        let mut file = recorded_file();
        file.data.set("title", "Old");
        state.set_resource(file);
        state.set_resource(recorded_grant("12"));

        let result = DiffEngine::new().compute_diff(&config(), Some(&state));
        let diff = result.diffs.iter().find(|d| d.name == "readme").unwrap();
        assert_eq!(diff.diff_type, DiffType::Update);
        assert_eq!(diff.details[0].field, "title");
    }

    #[test]
    fn test_changed_grant_is_replaced() {
        let mut state = ProviderState::new("w");
        state.set_resource(recorded_file());
        let mut grant = recorded_grant("12");
        grant.data.set("permission_level_akas", vec![String::from("other")]);
        state.set_resource(grant);

        let result = DiffEngine::new().compute_diff(&config(), Some(&state));
        assert_eq!(result.replaces, 1);
    }

    #[test]
    fn test_tainted_resource_is_replaced() {
        let mut state = ProviderState::new("w");
        let mut file = recorded_file();
        file.set_status(ResourceStatus::Tainted);
        state.set_resource(file);
        state.set_resource(recorded_grant("12"));

        let result = DiffEngine::new().compute_diff(&config(), Some(&state));
        let diff = result.diffs.iter().find(|d| d.name == "readme").unwrap();
        assert_eq!(diff.diff_type, DiffType::Replace);
    }

    #[test]
    fn test_removed_resource_is_deleted() {
        let mut state = ProviderState::new("w");
        state.set_resource(recorded_file());
        state.set_resource(recorded_grant("12"));
        let mut extra = recorded_file();
        extra.name = String::from("old-file");
        state.set_resource(extra);

        let result = DiffEngine::new().compute_diff(&config(), Some(&state));
        assert_eq!(result.deletes, 1);
        let diff = result.actionable_diffs()[0];
        assert_eq!(diff.name, "old-file");
        assert_eq!(diff.to_string(), "old-file: delete (id)");
    }
}
