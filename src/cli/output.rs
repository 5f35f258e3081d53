//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::planner::{ActionType, ExecutionPlan};
use crate::reconciler::{DriftReport, ReconciliationResult, RefreshReport};
use crate::state::{ProviderState, ResourceState, ResourceStatus};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Managed resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an execution plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ExecutionPlan, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan, detailed),
        }
    }

    fn format_plan_text(plan: &ExecutionPlan, detailed: bool) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes required - workspace is up to date.\n",
                "✓".green()
            );
        }

        let mut output = String::new();
        let _ = writeln!(output, "\n📋 Execution Plan");
        let _ = write!(output, "   Config hash: {}\n\n", short(&plan.config_hash));

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                kind: a.kind.to_string(),
                resource: a.resource_name.clone(),
                reason: Self::truncate(&a.reason, 40),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            output.push_str("\nChanges:\n");
            for action in plan.actions.iter().filter(|a| !a.changes.is_empty()) {
                let _ = writeln!(output, "   {}", action.description());
                for change in &action.changes {
                    let marker = if change.forces_replacement {
                        " (forces replacement)".red().to_string()
                    } else {
                        String::new()
                    };
                    let _ = writeln!(
                        output,
                        "     {}: {} -> {}{marker}",
                        change.field,
                        change.old_value.as_deref().unwrap_or("(none)"),
                        change.new_value.as_deref().unwrap_or("(none)"),
                    );
                }
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to update, {} to destroy\n",
            plan.count(ActionType::Create).to_string().green(),
            plan.count(ActionType::Update).to_string().yellow(),
            plan.count(ActionType::Delete).to_string().red()
        );

        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": result.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid!\n", "✓".green())
                } else {
                    format!("{} Configuration has {} error(s):\n", "✗".red(), result.error_count())
                };
                for error in &result.errors {
                    let _ = writeln!(output, "   - {error}");
                }
                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats a drift report.
    #[must_use]
    pub fn format_drift(&self, report: &DriftReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                if report.is_converged() && report.errors.is_empty() {
                    return format!("{} No drift detected - state is converged.\n", "✓".green());
                }

                let mut output = if report.is_converged() {
                    format!("{} No drift detected, but some resources could not be checked:\n", "⚠".yellow())
                } else {
                    format!("{} Drift detected:\n\n", "⚠".yellow())
                };
                for (name, fields) in &report.drifted_resources {
                    let _ = writeln!(output, "   ~ {name} changed remotely: {}", fields.join(", "));
                }
                for name in &report.missing_resources {
                    let _ = writeln!(output, "   - {name} is missing from the workspace");
                }
                for name in &report.pending_resources {
                    let _ = writeln!(output, "   * {name} has pending configuration changes");
                }
                for (name, error) in &report.errors {
                    let _ = writeln!(output, "   ! {name}: {error}");
                }
                let _ = write!(
                    output,
                    "\n{} recorded, {} configured.\n",
                    report.recorded_count, report.total_resources
                );
                output
            }
        }
    }

    /// Formats an apply or destroy result.
    #[must_use]
    pub fn format_reconciliation(&self, result: &ReconciliationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let status = if result.success {
                    format!("{} Apply successful", "✓".green())
                } else {
                    format!("{} Apply failed", "✗".red())
                };

                let mut output = format!("{status}\n\n");
                let _ = writeln!(output, "   Created: {}", result.created);
                let _ = writeln!(output, "   Updated: {}", result.updated);
                let _ = writeln!(output, "   Deleted: {}", result.deleted);
                let _ = writeln!(output, "   Unchanged: {}", result.unchanged);

                if !result.errors.is_empty() {
                    let _ = write!(output, "\n{} Errors:\n", "⚠".yellow());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }

                output
            }
        }
    }

    /// Formats a refresh report.
    #[must_use]
    pub fn format_refresh(&self, report: &RefreshReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("{} {report}", "↻".cyan());
                for name in &report.removed {
                    let _ = writeln!(output, "   {} {name} no longer exists", "-".red());
                }
                for (name, fields) in &report.drifted {
                    let _ = writeln!(output, "   {} {name}: {}", "~".yellow(), fields.join(", "));
                }
                output
            }
        }
    }

    /// Formats a single managed resource, as recorded after import.
    #[must_use]
    pub fn format_resource(&self, resource: &ResourceState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(resource).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} {} '{}' (ID: {})\n",
                    "✓".green(),
                    resource.kind,
                    resource.name,
                    resource.id()
                );
                for (field, value) in resource.data.fields() {
                    let _ = writeln!(output, "   {field} = {}", Self::truncate(&value.display(), 60));
                }
                output
            }
        }
    }

    /// Formats provider state.
    #[must_use]
    pub fn format_state(&self, state: &ProviderState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();

                let workspace = if state.workspace.is_empty() { "(unset)" } else { &state.workspace };
                let _ = write!(output, "\n💾 State: {workspace}\n\n");
                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Config hash: {}", short(&state.config_hash));
                let _ = writeln!(output, "   Last updated: {}", state.last_updated);
                let _ = writeln!(output, "   Resources: {}", state.resources.len());

                if !state.resources.is_empty() {
                    output.push('\n');
                    output.push_str(&self.format_resources(state));
                }

                if !state.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", state.history.len());
                    for entry in state.history.iter().rev().take(5) {
                        let status = if entry.success { "✓" } else { "✗" };
                        let _ = writeln!(
                            output,
                            "     {status} {} - {} ({})",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.operation,
                            entry.resources.join(", ")
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats the managed resources as a table.
    #[must_use]
    pub fn format_resources(&self, state: &ProviderState) -> String {
        match self.format {
            OutputFormat::Json => {
                let resources: Vec<&ResourceState> = state.resources.values().collect();
                serde_json::to_string_pretty(&resources).unwrap_or_default()
            }
            OutputFormat::Text => {
                if state.resources.is_empty() {
                    return String::from("   No resources managed.\n");
                }
                let rows: Vec<ResourceRow> = state
                    .resources
                    .values()
                    .map(|r| ResourceRow {
                        name: r.name.clone(),
                        kind: r.kind.to_string(),
                        id: Self::truncate(r.id(), 24),
                        status: Self::format_status(r.status),
                        updated: r.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                    })
                    .collect();
                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    fn format_status(status: ResourceStatus) -> String {
        match status {
            ResourceStatus::Ready => "ready".green().to_string(),
            ResourceStatus::Tainted => "tainted".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanJson {
    config_hash: String,
    action_count: usize,
    creates: usize,
    updates: usize,
    deletes: usize,
    actions: Vec<ActionJson>,
}

#[derive(serde::Serialize)]
struct ActionJson {
    action_type: String,
    kind: String,
    resource: String,
    reason: String,
    changes: Vec<String>,
}

impl From<&ExecutionPlan> for PlanJson {
    fn from(plan: &ExecutionPlan) -> Self {
        Self {
            config_hash: plan.config_hash.clone(),
            action_count: plan.action_count(),
            creates: plan.count(ActionType::Create),
            updates: plan.count(ActionType::Update),
            deletes: plan.count(ActionType::Delete),
            actions: plan
                .actions
                .iter()
                .map(|a| ActionJson {
                    action_type: a.action_type.to_string(),
                    kind: a.kind.to_string(),
                    resource: a.resource_name.clone(),
                    reason: a.reason.clone(),
                    changes: a.changes.iter().map(|c| c.field.clone()).collect(),
                })
                .collect(),
        }
    }
}
