//! Plan executor for applying execution plans.
//!
//! This module drives the resource handlers for each planned action and
//! records the outcome in the provider state.

use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::api::TurbotApi;
use crate::error::{PlanError, Result, TurbotError};
use crate::resources::handler_for;
use crate::state::{HistoryEntry, Operation, ProviderState, ResourceState, ResourceStatus};

use super::plan::{ActionType, ExecutionPlan, PlannedAction};

/// Error message recorded for actions skipped after a failed dependency.
const SKIPPED: &str = "Skipped due to dependency failure";

/// Executor for execution plans.
pub struct PlanExecutor<'a> {
    /// Turbot API client handed to every handler.
    client: &'a dyn TurbotApi,
    /// Whether to continue on errors.
    continue_on_error: bool,
}

/// Result of executing a single action.
#[derive(Debug)]
pub struct ActionResult {
    /// Action index.
    pub index: usize,
    /// Action that was executed.
    pub action: PlannedAction,
    /// Whether the action succeeded.
    pub success: bool,
    /// Remote id after the action (if any).
    pub resource_id: Option<String>,
    /// Error message (if failed).
    pub error: Option<String>,
}

/// Result of executing the entire plan.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Individual action results.
    pub results: Vec<ActionResult>,
    /// Total actions executed.
    pub total_executed: usize,
    /// Number of successful actions.
    pub successful: usize,
    /// Number of failed actions.
    pub failed: usize,
    /// Number of skipped actions (due to dependency failures).
    pub skipped: usize,
    /// Whether the entire plan succeeded.
    pub success: bool,
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(client: &'a dyn TurbotApi) -> Self {
        Self {
            client,
            continue_on_error: false,
        }
    }

    /// Sets whether to continue on errors.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Executes a plan, updating `state` after every action.
    ///
    /// # Errors
    ///
    /// Action failures are reported in the result, not as errors. This only
    /// fails on an inconsistent plan.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        state: &mut ProviderState,
        operation: Operation,
    ) -> Result<ExecutionResult> {
        info!("Executing plan with {} actions", plan.actions.len());

        let mut results = Vec::new();
        let mut failed_indices: HashSet<usize> = HashSet::new();

        for (idx, action) in plan.actions.iter().enumerate() {
            if action.dependencies.iter().any(|dep| failed_indices.contains(dep)) {
                warn!("Skipping action {idx} due to failed dependencies");
                results.push(ActionResult {
                    index: idx,
                    action: action.clone(),
                    success: false,
                    resource_id: None,
                    error: Some(String::from(SKIPPED)),
                });
                failed_indices.insert(idx);
                continue;
            }

            let result = self.execute_action(idx, action, state).await?;
            let succeeded = result.success;
            results.push(result);

            if !succeeded {
                failed_indices.insert(idx);
                if !self.continue_on_error {
                    break;
                }
            }
        }

        let skipped = results.iter().filter(|r| r.error.as_deref() == Some(SKIPPED)).count();
        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful - skipped;

        let execution_result = ExecutionResult {
            total_executed: results.len(),
            successful,
            failed,
            skipped,
            success: failed == 0 && skipped == 0,
            results,
        };

        let names: Vec<String> = plan.actions.iter().map(|a| a.resource_name.clone()).collect();
        let history_entry = if execution_result.success {
            HistoryEntry::new(operation, &plan.config_hash, names)
        } else {
            HistoryEntry::failed(
                operation,
                &plan.config_hash,
                names,
                &format!("{} actions failed", execution_result.failed),
            )
        };
        state.add_history(history_entry);
        if execution_result.success {
            state.config_hash.clone_from(&plan.config_hash);
        }

        Ok(execution_result)
    }

    async fn execute_action(
        &self,
        index: usize,
        action: &PlannedAction,
        state: &mut ProviderState,
    ) -> Result<ActionResult> {
        info!("Executing action {index}: {}", action.description());

        let outcome = match action.action_type {
            ActionType::Create => self.execute_create(action, state).await,
            ActionType::Update => self.execute_update(action, state).await,
            ActionType::Delete => self.execute_delete(action, state).await,
        };

        Ok(match outcome {
            Ok(resource_id) => ActionResult {
                index,
                action: action.clone(),
                success: true,
                resource_id,
                error: None,
            },
            Err(e @ TurbotError::Plan(_)) => return Err(e),
            Err(e) => {
                error!("Failed to {} {}: {e}", action.action_type, action.resource_name);
                ActionResult {
                    index,
                    action: action.clone(),
                    success: false,
                    resource_id: state.get_resource(&action.resource_name).map(|r| r.id().to_string()),
                    error: Some(e.to_string()),
                }
            }
        })
    }

    async fn execute_create(&self, action: &PlannedAction, state: &mut ProviderState) -> Result<Option<String>> {
        let resource = action.resource_config.as_ref().ok_or_else(|| {
            TurbotError::internal(format!("No configuration for '{}'", action.resource_name))
        })?;

        let mut data = resource.to_resource_data();
        let config_hash = action.new_hash.as_deref().unwrap_or_default();
        let handler = handler_for(resource.kind, self.client);

        match handler.create(&mut data).await {
            Ok(()) => {
                let id = data.id().to_string();
                state.set_resource(ResourceState::new(&resource.name, resource.kind, data, config_hash));
                info!("Created {} '{}' (ID: {id})", resource.kind, resource.name);
                Ok(Some(id))
            }
            Err(e) => {
                // The remote entity exists once an id is assigned
                if data.has_id() {
                    warn!("{} '{}' was created but is incomplete, marking tainted", resource.kind, resource.name);
                    let mut tainted = ResourceState::new(&resource.name, resource.kind, data, config_hash);
                    tainted.set_status(ResourceStatus::Tainted);
                    state.set_resource(tainted);
                }
                Err(e)
            }
        }
    }

    async fn execute_update(&self, action: &PlannedAction, state: &mut ProviderState) -> Result<Option<String>> {
        let resource = action.resource_config.as_ref().ok_or_else(|| {
            TurbotError::internal(format!("No configuration for '{}'", action.resource_name))
        })?;
        if !resource.kind.schema().updatable {
            let field = action.changes.first().map(|c| c.field.clone()).unwrap_or_default();
            return Err(PlanError::ImmutableField {
                name: resource.name.clone(),
                field,
            }
            .into());
        }

        let Some(recorded) = state.get_resource(&resource.name) else {
            return Err(TurbotError::internal(format!(
                "No recorded state for '{}'",
                resource.name
            )));
        };

        // Configured fields over the recorded ones keep computed akas and the id
        let mut data = recorded.data.clone();
        for (name, value) in &resource.fields {
            data.set(name.clone(), value.clone());
        }

        let handler = handler_for(resource.kind, self.client);
        match handler.update(&mut data).await {
            Ok(()) => {
                let id = data.id().to_string();
                if let Some(recorded) = state.get_resource_mut(&resource.name) {
                    recorded.set_data(data);
                    recorded.config_hash = action.new_hash.clone().unwrap_or_default();
                }
                info!("Updated {} '{}'", resource.kind, resource.name);
                Ok(Some(id))
            }
            Err(e) => {
                if e.is_not_found() {
                    warn!("{} '{}' no longer exists, dropping from state", resource.kind, resource.name);
                    state.remove_resource(&resource.name);
                }
                Err(e)
            }
        }
    }

    async fn execute_delete(&self, action: &PlannedAction, state: &mut ProviderState) -> Result<Option<String>> {
        let Some(recorded) = state.get_resource(&action.resource_name) else {
            debug!("No state for {}, considering delete successful", action.resource_name);
            return Ok(None);
        };

        let mut data = recorded.data.clone();
        let id = data.id().to_string();
        let handler = handler_for(recorded.kind, self.client);

        match handler.delete(&mut data).await {
            Ok(()) => {
                state.remove_resource(&action.resource_name);
                info!("Deleted {} '{}' (ID: {id})", action.kind, action.resource_name);
                Ok(Some(id))
            }
            Err(e) if e.is_not_found() => {
                state.remove_resource(&action.resource_name);
                info!("{} '{}' was already deleted", action.kind, action.resource_name);
                Ok(Some(id))
            }
            Err(e) => Err(e),
        }
    }
}

impl ExecutionResult {
    /// Returns true if all actions succeeded.
    #[must_use]
    pub const fn all_successful(&self) -> bool {
        self.success && self.failed == 0 && self.skipped == 0
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Executed {} actions: {} successful, {} failed, {} skipped",
            self.total_executed, self.successful, self.failed, self.skipped
        )
    }
}
