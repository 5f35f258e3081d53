//! Planning module for provider operations.
//!
//! This module handles the comparison between configured and recorded
//! resources, generating execution plans and driving the resource handlers
//! to apply them.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffDetail, DiffEngine, DiffResult, DiffType, ResourceDiff};
pub use executor::{ActionResult, ExecutionResult, PlanExecutor};
pub use plan::{ActionType, ExecutionPlan, PlannedAction};
