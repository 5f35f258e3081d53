//! Reconciler for converging Turbot resources on the configuration.
//!
//! This module ties state, planning and the resource handlers together:
//! refreshing recorded resources from the workspace, detecting drift,
//! importing existing entities and applying or destroying plans. Every
//! mutating operation runs under the state lock.

use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::api::TurbotApi;
use crate::config::{ConfigHasher, ProviderConfig};
use crate::error::{PlanError, Result};
use crate::planner::{DiffEngine, DiffResult, ExecutionPlan, ExecutionResult, PlanExecutor};
use crate::resources::{ResourceKind, handler_for};
use crate::schema::{FieldMode, FieldValue, ResourceData};
use crate::state::{
    HistoryEntry, LockInfo, Operation, ProviderState, ResourceState, StateStore, generate_holder_id,
};

/// Reconciler for maintaining desired state.
pub struct Reconciler<'a, S: StateStore> {
    /// Configuration.
    config: &'a ProviderConfig,
    /// State store.
    state_store: &'a S,
    /// Turbot API client.
    client: &'a dyn TurbotApi,
    /// Configuration hasher.
    hasher: ConfigHasher,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Whether to keep executing after a failed action.
    continue_on_error: bool,
    /// Whether to refresh state before planning.
    refresh: bool,
}

/// Result of an apply or destroy run.
#[derive(Debug, serde::Serialize)]
pub struct ReconciliationResult {
    /// Whether every action succeeded.
    pub success: bool,
    /// Number of resources created (replacements included).
    pub created: usize,
    /// Number of resources updated in place.
    pub updated: usize,
    /// Number of resources deleted (replacements included).
    pub deleted: usize,
    /// Number of resources unchanged.
    pub unchanged: usize,
    /// Errors encountered.
    pub errors: Vec<String>,
    /// Refresh performed before planning.
    #[serde(skip)]
    pub refresh: Option<RefreshReport>,
}

/// Outcome of refreshing recorded resources.
#[derive(Debug, Default, serde::Serialize)]
pub struct RefreshReport {
    /// Resources read successfully.
    pub refreshed: Vec<String>,
    /// Resources that no longer exist and were dropped from state.
    pub removed: Vec<String>,
    /// Resources whose remote fields changed, with the changed field names.
    pub drifted: Vec<(String, Vec<String>)>,
    /// Resources that could not be refreshed.
    pub errors: Vec<(String, String)>,
}

/// Report of drift detection.
#[derive(Debug, serde::Serialize)]
pub struct DriftReport {
    /// Whether drift was detected.
    pub has_drift: bool,
    /// Resources changed outside of this tool.
    pub drifted_resources: Vec<(String, Vec<String>)>,
    /// Recorded resources missing from the workspace.
    pub missing_resources: Vec<String>,
    /// Resources with pending configuration changes.
    pub pending_resources: Vec<String>,
    /// Total number of resources in config.
    pub total_resources: usize,
    /// Number of resources recorded in state.
    pub recorded_count: usize,
    /// Resources that could not be checked.
    pub errors: Vec<(String, String)>,
}

impl<'a, S: StateStore> Reconciler<'a, S> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(config: &'a ProviderConfig, state_store: &'a S, client: &'a dyn TurbotApi) -> Self {
        Self {
            config,
            state_store,
            client,
            hasher: ConfigHasher::new(),
            diff_engine: DiffEngine::new(),
            continue_on_error: false,
            refresh: true,
        }
    }

    /// Sets whether to continue after a failed action.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Sets whether recorded resources are refreshed before planning.
    #[must_use]
    pub const fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Computes the plan without changing anything.
    ///
    /// Refreshed data is used for the diff but not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if state cannot be loaded.
    pub async fn plan(&self) -> Result<(DiffResult, ExecutionPlan)> {
        let mut state = self.load_state().await?;
        if self.refresh {
            self.refresh_state(&mut state).await;
        }
        Ok(self.plan_for(&state))
    }

    /// Applies the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken, state cannot be read or
    /// written, or the plan is inconsistent. Failed actions are reported in
    /// the result.
    pub async fn apply(&self) -> Result<ReconciliationResult> {
        let lock = self.lock(Operation::Apply).await?;
        let result = self.apply_locked().await;
        self.unlock(&lock).await;
        result
    }

    async fn apply_locked(&self) -> Result<ReconciliationResult> {
        let mut state = self.load_state().await?;

        let refresh = if self.refresh {
            Some(self.refresh_state(&mut state).await)
        } else {
            None
        };

        let (diff, plan) = self.plan_for(&state);
        if plan.is_empty() {
            info!("No changes required");
            self.state_store.save(&state).await?;
            return Ok(ReconciliationResult {
                success: true,
                created: 0,
                updated: 0,
                deleted: 0,
                unchanged: diff.unchanged,
                errors: vec![],
                refresh,
            });
        }

        info!("Applying {} actions", plan.action_count());
        let execution = PlanExecutor::new(self.client)
            .with_continue_on_error(self.continue_on_error)
            .execute(&plan, &mut state, Operation::Apply)
            .await?;
        self.state_store.save(&state).await?;

        Ok(ReconciliationResult {
            success: execution.success,
            created: diff.creates + diff.replaces,
            updated: diff.updates,
            deleted: diff.deletes + diff.replaces,
            unchanged: diff.unchanged,
            errors: execution_errors(&execution),
            refresh,
        })
    }

    /// Deletes every recorded resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken or state cannot be read
    /// or written.
    pub async fn destroy(&self) -> Result<ReconciliationResult> {
        let lock = self.lock(Operation::Destroy).await?;
        let result = self.destroy_locked().await;
        self.unlock(&lock).await;
        result
    }

    async fn destroy_locked(&self) -> Result<ReconciliationResult> {
        let mut state = self.load_state().await?;
        let plan = ExecutionPlan::destroy(&recorded_kinds(&state), &self.hasher.hash_config(self.config));

        let execution = PlanExecutor::new(self.client)
            .with_continue_on_error(true)
            .execute(&plan, &mut state, Operation::Destroy)
            .await?;
        if execution.success {
            state.config_hash.clear();
        }
        self.state_store.save(&state).await?;

        Ok(ReconciliationResult {
            success: execution.success,
            created: 0,
            updated: 0,
            deleted: execution.successful,
            unchanged: 0,
            errors: execution_errors(&execution),
            refresh: None,
        })
    }

    /// Refreshes every recorded resource and saves the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken or state cannot be read
    /// or written. Per-resource failures are reported.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let lock = self.lock(Operation::Refresh).await?;
        let result = self.refresh_locked().await;
        self.unlock(&lock).await;
        result
    }

    async fn refresh_locked(&self) -> Result<RefreshReport> {
        let mut state = self.load_state().await?;
        let report = self.refresh_state(&mut state).await;

        let entry = if report.errors.is_empty() {
            HistoryEntry::new(Operation::Refresh, &state.config_hash, report.refreshed.clone())
        } else {
            HistoryEntry::failed(
                Operation::Refresh,
                &state.config_hash,
                report.refreshed.clone(),
                &format!("{} resources could not be refreshed", report.errors.len()),
            )
        };
        state.add_history(entry);
        self.state_store.save(&state).await?;
        Ok(report)
    }

    /// Brings an existing remote entity under management as `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already managed, the configured kind
    /// differs, or the entity cannot be read.
    pub async fn import(&self, name: &str, kind: ResourceKind, id: &str) -> Result<ResourceState> {
        let lock = self.lock(Operation::Import).await?;
        let result = self.import_locked(name, kind, id).await;
        self.unlock(&lock).await;
        result
    }

    async fn import_locked(&self, name: &str, kind: ResourceKind, id: &str) -> Result<ResourceState> {
        let mut state = self.load_state().await?;

        if let Some(existing) = state.get_resource(name) {
            return Err(PlanError::AlreadyManaged {
                name: name.to_string(),
                id: existing.id().to_string(),
            }
            .into());
        }

        let configured = self.config.resources.iter().find(|r| r.name == name);
        if let Some(resource) = configured
            && resource.kind != kind
        {
            return Err(PlanError::KindMismatch {
                name: name.to_string(),
                configured: resource.kind.to_string(),
                requested: kind.to_string(),
            }
            .into());
        }

        let mut data = ResourceData::with_id(id);
        handler_for(kind, self.client).import(&mut data).await?;

        // Unconfigured imports plan as deletes until added to the configuration
        let config_hash = configured.map(|r| self.hasher.hash_resource(r)).unwrap_or_default();
        let resource = ResourceState::new(name, kind, data, &config_hash);
        info!("Imported {kind} '{name}' (ID: {})", resource.id());

        let entry = HistoryEntry::new(Operation::Import, &state.config_hash, vec![name.to_string()]);
        state.set_resource(resource.clone());
        state.add_history(entry);
        self.state_store.save(&state).await?;

        Ok(resource)
    }

    /// Checks for drift without applying changes or saving state.
    ///
    /// # Errors
    ///
    /// Returns an error if state cannot be loaded.
    pub async fn check_drift(&self) -> Result<DriftReport> {
        let mut state = self.load_state().await?;
        let recorded_count = state.resources.len();

        let refresh = self.refresh_state(&mut state).await;
        let diff = self.diff_engine.compute_diff(self.config, Some(&state));

        let pending_resources: Vec<String> = diff
            .actionable_diffs()
            .into_iter()
            .map(|d| d.name.clone())
            .collect();

        Ok(DriftReport {
            has_drift: !refresh.drifted.is_empty() || !refresh.removed.is_empty() || diff.has_changes(),
            drifted_resources: refresh.drifted,
            missing_resources: refresh.removed,
            pending_resources,
            total_resources: self.config.resources.len(),
            recorded_count,
            errors: refresh.errors,
        })
    }

    /// Re-reads every recorded resource into `state`.
    ///
    /// Resources gone from the workspace are dropped. Resources that fail
    /// to refresh keep their recorded data.
    pub async fn refresh_state(&self, state: &mut ProviderState) -> RefreshReport {
        let mut report = RefreshReport::default();
        let names: Vec<String> = state.resource_names().into_iter().map(String::from).collect();

        for name in names {
            let Some(recorded) = state.get_resource(&name) else {
                continue;
            };
            let kind = recorded.kind;
            let before = recorded.data.clone();
            let handler = handler_for(kind, self.client);

            match handler.exists(&before).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("{kind} '{name}' no longer exists, dropping from state");
                    state.remove_resource(&name);
                    report.removed.push(name);
                    continue;
                }
                Err(e) if e.is_not_found() => {
                    warn!("{kind} '{name}' no longer exists, dropping from state");
                    state.remove_resource(&name);
                    report.removed.push(name);
                    continue;
                }
                Err(e) => {
                    error!("Failed to check {kind} '{name}': {e}");
                    report.errors.push((name, e.to_string()));
                    continue;
                }
            }

            let mut data = before.clone();
            match handler.read(&mut data).await {
                Ok(()) => {
                    let changed = changed_fields(kind, &before, &data);
                    if !changed.is_empty() {
                        debug!("{kind} '{name}' drifted: {}", changed.join(", "));
                        report.drifted.push((name.clone(), changed));
                    }
                    if let Some(recorded) = state.get_resource_mut(&name) {
                        recorded.set_data(data);
                    }
                    report.refreshed.push(name);
                }
                Err(e) if e.is_not_found() => {
                    warn!("{kind} '{name}' was deleted remotely, dropping from state");
                    state.remove_resource(&name);
                    report.removed.push(name);
                }
                Err(e) => {
                    error!("Failed to refresh {kind} '{name}': {e}");
                    report.errors.push((name, e.to_string()));
                }
            }
        }

        report
    }

    fn plan_for(&self, state: &ProviderState) -> (DiffResult, ExecutionPlan) {
        let diff = self.diff_engine.compute_diff(self.config, Some(state));
        let plan = ExecutionPlan::from_diff(
            &diff,
            self.config,
            &recorded_kinds(state),
            &self.hasher.hash_config(self.config),
        );
        (diff, plan)
    }

    async fn load_state(&self) -> Result<ProviderState> {
        Ok(self.state_store.load().await?.unwrap_or_else(|| {
            debug!("No existing state, starting fresh");
            ProviderState::new(self.config.workspace.url.as_deref().unwrap_or_default())
        }))
    }

    async fn lock(&self, operation: Operation) -> Result<LockInfo> {
        self.state_store
            .acquire_lock(&generate_holder_id(), &operation.to_string())
            .await
    }

    async fn unlock(&self, lock: &LockInfo) {
        if let Err(e) = self.state_store.release_lock(&lock.lock_id).await {
            warn!("Failed to release state lock {}: {e}", lock.lock_id);
        }
    }
}

fn recorded_kinds(state: &ProviderState) -> Vec<(String, ResourceKind)> {
    state
        .resources
        .values()
        .map(|r| (r.name.clone(), r.kind))
        .collect()
}

fn execution_errors(execution: &ExecutionResult) -> Vec<String> {
    execution
        .results
        .iter()
        .filter_map(|r| {
            r.error
                .as_ref()
                .map(|e| format!("{}: {e}", r.action.resource_name))
        })
        .collect()
}

/// Names of user-facing fields whose value changed between two reads.
fn changed_fields(kind: ResourceKind, before: &ResourceData, after: &ResourceData) -> Vec<String> {
    let schema = kind.schema();
    let names: BTreeSet<&String> = before.fields().keys().chain(after.fields().keys()).collect();

    names
        .into_iter()
        .filter(|name| {
            let Some(field) = schema.field(name) else {
                return false;
            };
            if field.mode == FieldMode::Computed {
                return false;
            }

            let old = before.get(name);
            let new = after.get(name);
            if old == new {
                return false;
            }
            match (old.and_then(FieldValue::as_str), new.and_then(FieldValue::as_str)) {
                // a recorded aka matching the refreshed id is not drift
                (Some(old), Some(new)) => !field.suppresses(new, old, after),
                _ => !(old.is_none_or(FieldValue::is_empty) && new.is_none_or(FieldValue::is_empty)),
            }
        })
        .cloned()
        .collect()
}

impl DriftReport {
    /// Returns true if the state is converged (no drift).
    #[must_use]
    pub const fn is_converged(&self) -> bool {
        !self.has_drift
    }
}

impl std::fmt::Display for DriftReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.has_drift {
            write!(f, "No drift detected - state is converged")?;
        } else {
            writeln!(f, "Drift detected:")?;
            for (name, fields) in &self.drifted_resources {
                writeln!(f, "  ~ {name} (changed: {})", fields.join(", "))?;
            }
            for name in &self.missing_resources {
                writeln!(f, "  - {name} (missing from workspace)")?;
            }
            for name in &self.pending_resources {
                writeln!(f, "  * {name} (pending changes)")?;
            }
        }

        for (name, error) in &self.errors {
            write!(f, "\n  ! {name}: {error}")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for RefreshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Refresh complete:")?;
        writeln!(f, "  Refreshed: {}", self.refreshed.len())?;
        writeln!(f, "  Removed: {}", self.removed.len())?;
        writeln!(f, "  Drifted: {}", self.drifted.len())?;

        if !self.errors.is_empty() {
            writeln!(f, "  Errors:")?;
            for (name, error) in &self.errors {
                writeln!(f, "    - {name}: {error}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.success { "successful" } else { "failed" };
        writeln!(f, "Apply {status}:")?;
        writeln!(f, "  Created: {}", self.created)?;
        writeln!(f, "  Updated: {}", self.updated)?;
        writeln!(f, "  Deleted: {}", self.deleted)?;
        writeln!(f, "  Unchanged: {}", self.unchanged)?;

        if !self.errors.is_empty() {
            writeln!(f, "  Errors:")?;
            for error in &self.errors {
                writeln!(f, "    - {error}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Grant, MockTurbotApi, TurbotMetadata};
    use crate::config::ConfigParser;
    use crate::error::{ApiError, TurbotError};
    use crate::state::{LocalStateStore, ResourceStatus};
    use tempfile::TempDir;

    fn grant_config() -> ProviderConfig {
        ConfigParser::new()
            .parse_yaml(
                r#"
workspace:
  url: https://example.cloud.turbot.com
resources:
  - name: admins
    kind: grant
    fields:
      resource: "14"
      identity: "13"
      type: "11"
      level: "12"
"#,
                None,
            )
            .unwrap()
    }

    fn remote_grant(level: &str) -> Grant {
        Grant {
            permission_type_id: String::from("11"),
            permission_level_id: level.to_string(),
            turbot: TurbotMetadata {
                id: String::from("300001"),
                profile_id: String::from("13"),
                resource_id: String::from("14"),
                ..TurbotMetadata::default()
            },
        }
    }

    fn store() -> (TempDir, LocalStateStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStateStore::with_state_path(dir.path().join("state.json"));
        (dir, store)
    }

    async fn seed(store: &LocalStateStore, config: &ProviderConfig) {
        let mut data = config.resources[0].to_resource_data();
        data.set_id("300001");
        let hash = ConfigHasher::new().hash_resource(&config.resources[0]);
        let mut state = ProviderState::new("https://example.cloud.turbot.com");
        state.set_resource(ResourceState::new("admins", ResourceKind::Grant, data, &hash));
        store.save(&state).await.unwrap();
    }

    fn akas(client: &mut MockTurbotApi) {
        client
            .expect_get_resource_akas()
            .returning(|reference| Ok(vec![format!("aka:{reference}")]));
    }

    #[tokio::test]
    async fn test_apply_creates_and_saves_state() {
        let (_dir, store) = store();
        let config = grant_config();
        let mut client = MockTurbotApi::new();
        client.expect_create_grant().times(1).returning(|_| {
            Ok(TurbotMetadata {
                id: String::from("300001"),
                ..TurbotMetadata::default()
            })
        });
        akas(&mut client);

        let result = Reconciler::new(&config, &store, &client).apply().await.unwrap();
        assert!(result.success);
        assert_eq!(result.created, 1);

        let state = store.load().await.unwrap().unwrap();
        assert_eq!(state.get_resource("admins").unwrap().id(), "300001");
        assert_eq!(state.config_hash, ConfigHasher::new().hash_config(&config));
        assert!(!store.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_without_changes_is_noop() {
        let (_dir, store) = store();
        let config = grant_config();
        seed(&store, &config).await;

        let mut client = MockTurbotApi::new();
        client.expect_grant_exists().returning(|_| Ok(true));
        client.expect_read_grant().returning(|_| Ok(remote_grant("12")));
        akas(&mut client);

        let result = Reconciler::new(&config, &store, &client).apply().await.unwrap();
        assert!(result.success);
        assert_eq!(result.unchanged, 1);
        assert_eq!(result.created + result.deleted + result.updated, 0);
    }

    #[tokio::test]
    async fn test_refresh_drops_missing_resources() {
        let (_dir, store) = store();
        let config = grant_config();
        seed(&store, &config).await;

        let mut client = MockTurbotApi::new();
        client.expect_grant_exists().returning(|_| Ok(false));

        let report = Reconciler::new(&config, &store, &client).refresh().await.unwrap();
        assert_eq!(report.removed, ["admins"]);

        let state = store.load().await.unwrap().unwrap();
        assert!(state.get_resource("admins").is_none());
        assert_eq!(state.history.last().unwrap().operation, Operation::Refresh);
    }

    #[tokio::test]
    async fn test_refresh_keeps_resources_on_remote_errors() {
        let (_dir, store) = store();
        let config = grant_config();
        seed(&store, &config).await;

        let mut client = MockTurbotApi::new();
        client
            .expect_grant_exists()
            .returning(|_| Err(ApiError::request(500, "boom").into()));

        let report = Reconciler::new(&config, &store, &client).refresh().await.unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(store.load().await.unwrap().unwrap().get_resource("admins").is_some());
    }

    #[tokio::test]
    async fn test_check_drift_reports_changed_fields() {
        let (_dir, store) = store();
        let config = grant_config();
        seed(&store, &config).await;

        let mut client = MockTurbotApi::new();
        client.expect_grant_exists().returning(|_| Ok(true));
        client.expect_read_grant().returning(|_| Ok(remote_grant("99")));
        akas(&mut client);

        let report = Reconciler::new(&config, &store, &client).check_drift().await.unwrap();
        assert!(report.has_drift);
        assert_eq!(report.drifted_resources, [(String::from("admins"), vec![String::from("level")])]);
        assert_eq!(report.pending_resources, ["admins"]);

        // drift checks never write state
        let state = store.load().await.unwrap().unwrap();
        assert_eq!(state.get_resource("admins").unwrap().data.get_str("level"), "12");
    }

    #[tokio::test]
    async fn test_check_drift_ignores_aka_references() {
        let (_dir, store) = store();
        let mut config = grant_config();
        config.resources[0]
            .fields
            .insert(String::from("resource"), FieldValue::from("aka:14"));
        seed(&store, &config).await;

        let mut client = MockTurbotApi::new();
        client.expect_grant_exists().returning(|_| Ok(true));
        client.expect_read_grant().returning(|_| Ok(remote_grant("12")));
        akas(&mut client);

        let report = Reconciler::new(&config, &store, &client).check_drift().await.unwrap();
        assert!(report.is_converged(), "{report}");
    }

    #[tokio::test]
    async fn test_import_records_resource() {
        let (_dir, store) = store();
        let config = grant_config();

        let mut client = MockTurbotApi::new();
        client.expect_read_grant().returning(|_| Ok(remote_grant("12")));
        akas(&mut client);

        let resource = Reconciler::new(&config, &store, &client)
            .import("admins", ResourceKind::Grant, "300001")
            .await
            .unwrap();
        assert_eq!(resource.id(), "300001");
        assert_eq!(resource.status, ResourceStatus::Ready);
        assert_eq!(resource.config_hash, ConfigHasher::new().hash_resource(&config.resources[0]));

        let state = store.load().await.unwrap().unwrap();
        assert_eq!(state.get_resource("admins").unwrap().data.get_str("level"), "12");
    }

    #[tokio::test]
    async fn test_import_rejects_managed_name_and_wrong_kind() {
        let (_dir, store) = store();
        let config = grant_config();
        let client = MockTurbotApi::new();
        let reconciler = Reconciler::new(&config, &store, &client);

        let err = reconciler
            .import("admins", ResourceKind::File, "1")
            .await
            .unwrap_err();
        assert!(matches!(err, TurbotError::Plan(PlanError::KindMismatch { .. })));

        seed(&store, &config).await;
        let err = reconciler
            .import("admins", ResourceKind::Grant, "1")
            .await
            .unwrap_err();
        assert!(matches!(err, TurbotError::Plan(PlanError::AlreadyManaged { .. })));
        assert!(!store.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_destroy_removes_everything() {
        let (_dir, store) = store();
        let config = grant_config();
        seed(&store, &config).await;

        let mut client = MockTurbotApi::new();
        client.expect_delete_grant().times(1).returning(|_| Ok(()));

        let result = Reconciler::new(&config, &store, &client).destroy().await.unwrap();
        assert!(result.success);
        assert_eq!(result.deleted, 1);
        assert!(store.load().await.unwrap().unwrap().resources.is_empty());
    }
}
