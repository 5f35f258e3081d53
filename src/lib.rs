// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Tests are allowed to unwrap and panic
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Turbot Provider
//!
//! Declarative lifecycle management for Turbot cloud-governance resources.
//!
//! ## Overview
//!
//! Resources are declared in `turbot.yaml` and converged on a Turbot
//! workspace through its GraphQL API:
//!
//! - **file**: a JSON document stored under a parent resource
//! - **grant**: a permission grant of a type and level to an identity
//! - **`smart_folder_attachment`**: membership of a resource in a smart folder
//!
//! Configuration may name related resources by id or by any of their akas
//! (alternate identifiers such as ARNs or `tmod:` URIs). After every read the
//! recorded state holds ids, and the resolved aka lists are cached so that a
//! configured aka does not show up as a perpetual diff.
//!
//! ## Architecture
//!
//! 1. **Desired State**: Defined in `turbot.yaml`
//! 2. **Recorded State**: Local JSON file written after every operation
//! 3. **Reconciler**: Refreshes, diffs, plans and drives the resource handlers
//!
//! ## Modules
//!
//! - [`api`]: Turbot GraphQL client and the [`api::TurbotApi`] seam
//! - [`schema`]: Field schemas, resource data and diff suppression
//! - [`helpers`]: JSON canonicalization, composite ids and input mapping
//! - [`resources`]: Lifecycle handlers per resource kind
//! - [`config`]: Configuration parsing, credentials and validation
//! - [`state`]: Local state storage and locking
//! - [`planner`]: Diff computation, execution planning and execution
//! - [`reconciler`]: Refresh, drift detection, import, apply and destroy
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! workspace:
//!   url: https://example.cloud.turbot.com
//!
//! resources:
//!   - name: team-notes
//!     kind: file
//!     fields:
//!       parent: tmod:@turbot/turbot#/
//!       title: Team notes
//!       data: '{ "owner": "platform" }'
//!
//!   - name: baseline
//!     kind: smart_folder_attachment
//!     fields:
//!       resource: arn:aws:s3:::my-bucket
//!       smart_folder: "171930"
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod helpers;
pub mod planner;
pub mod reconciler;
pub mod resources;
pub mod schema;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{TurbotApi, TurbotClient};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, ProviderConfig};
pub use error::{Result, TurbotError};
pub use planner::{DiffEngine, ExecutionPlan, PlanExecutor};
pub use reconciler::{DriftReport, ReconciliationResult, Reconciler, RefreshReport};
pub use resources::{ResourceHandler, ResourceKind, handler_for};
pub use schema::{FieldValue, ResourceData};
pub use state::{LocalStateStore, ProviderState, StateStore};
