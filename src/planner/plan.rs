//! Execution plan types and construction.
//!
//! This module turns a diff into an ordered list of handler calls.

use chrono::{DateTime, Utc};

use crate::config::{ProviderConfig, ResourceConfig};
use crate::resources::ResourceKind;

use super::diff::{DiffDetail, DiffResult, DiffType};

/// A complete execution plan.
#[derive(Debug)]
pub struct ExecutionPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Configuration hash this plan is based on.
    pub config_hash: String,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned action.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Resource name.
    pub resource_name: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Desired configuration (absent for deletes).
    pub resource_config: Option<ResourceConfig>,
    /// Reason for this action.
    pub reason: String,
    /// Field-level changes behind this action.
    pub changes: Vec<DiffDetail>,
    /// New configuration hash (if applicable).
    pub new_hash: Option<String>,
    /// Dependencies (action indices that must complete first).
    pub dependencies: Vec<usize>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Create a new resource.
    Create,
    /// Update a resource in place.
    Update,
    /// Delete a resource.
    Delete,
}

impl ExecutionPlan {
    /// Creates a plan from a diff result.
    ///
    /// Deletes run first, then creates, then updates. A replacement becomes a
    /// delete followed by a dependent create.
    #[must_use]
    pub fn from_diff(diff: &DiffResult, config: &ProviderConfig, recorded: &[(String, ResourceKind)], config_hash: &str) -> Self {
        let mut actions = Vec::new();
        let find_config = |name: &str| config.resources.iter().find(|r| r.name == name);
        let recorded_kind = |name: &str| {
            recorded
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, kind)| *kind)
        };

        for resource_diff in &diff.diffs {
            if resource_diff.diff_type == DiffType::Delete
                && let Some(kind) = recorded_kind(&resource_diff.name) {
                    actions.push(PlannedAction {
                        action_type: ActionType::Delete,
                        resource_name: resource_diff.name.clone(),
                        kind,
                        resource_config: None,
                        reason: String::from("Resource removed from configuration"),
                        changes: resource_diff.details.clone(),
                        new_hash: None,
                        dependencies: vec![],
                    });
                }
        }

        for resource_diff in &diff.diffs {
            if resource_diff.diff_type == DiffType::Create
                && let Some(resource) = find_config(&resource_diff.name) {
                    actions.push(PlannedAction {
                        action_type: ActionType::Create,
                        resource_name: resource_diff.name.clone(),
                        kind: resource.kind,
                        resource_config: Some(resource.clone()),
                        reason: String::from("Resource defined in configuration"),
                        changes: vec![],
                        new_hash: resource_diff.new_hash.clone(),
                        dependencies: vec![],
                    });
                }
        }

        for resource_diff in &diff.diffs {
            let Some(resource) = find_config(&resource_diff.name) else {
                continue;
            };
            let changed: Vec<&str> = resource_diff.details.iter().map(|d| d.field.as_str()).collect();

            match resource_diff.diff_type {
                DiffType::Update => actions.push(PlannedAction {
                    action_type: ActionType::Update,
                    resource_name: resource_diff.name.clone(),
                    kind: resource.kind,
                    resource_config: Some(resource.clone()),
                    reason: format!("Changed: {}", changed.join(", ")),
                    changes: resource_diff.details.clone(),
                    new_hash: resource_diff.new_hash.clone(),
                    dependencies: vec![],
                }),
                DiffType::Replace => {
                    let delete_idx = actions.len();
                    let reason = format!("Replacing due to {}", changed.join(", "));
                    actions.push(PlannedAction {
                        action_type: ActionType::Delete,
                        resource_name: resource_diff.name.clone(),
                        kind: recorded_kind(&resource_diff.name).unwrap_or(resource.kind),
                        resource_config: None,
                        reason: reason.clone(),
                        changes: resource_diff.details.clone(),
                        new_hash: None,
                        dependencies: vec![],
                    });
                    actions.push(PlannedAction {
                        action_type: ActionType::Create,
                        resource_name: resource_diff.name.clone(),
                        kind: resource.kind,
                        resource_config: Some(resource.clone()),
                        reason,
                        changes: resource_diff.details.clone(),
                        new_hash: resource_diff.new_hash.clone(),
                        dependencies: vec![delete_idx],
                    });
                }
                DiffType::Create | DiffType::Delete | DiffType::NoChange => {}
            }
        }

        Self {
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            actions,
        }
    }

    /// Creates a plan deleting every recorded resource.
    #[must_use]
    pub fn destroy(recorded: &[(String, ResourceKind)], config_hash: &str) -> Self {
        let actions = recorded
            .iter()
            .map(|(name, kind)| PlannedAction {
                action_type: ActionType::Delete,
                resource_name: name.clone(),
                kind: *kind,
                resource_config: None,
                reason: String::from("Destroy requested"),
                changes: vec![],
                new_hash: None,
                dependencies: vec![],
            })
            .collect();

        Self {
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            actions,
        }
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of actions.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of actions of a type.
    #[must_use]
    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }
}

impl PlannedAction {
    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::Create => format!("Create {} '{}'", self.kind, self.resource_name),
            ActionType::Update => format!("Update {} '{}'", self.kind, self.resource_name),
            ActionType::Delete => format!("Delete {} '{}'", self.kind, self.resource_name),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.resource_name)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Execution Plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}
