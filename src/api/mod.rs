//! Turbot API integration module.
//!
//! This module provides the GraphQL client for the Turbot API and the
//! [`TurbotApi`] trait the resource handlers are written against.

mod client;
mod service;
mod types;

pub use client::{TurbotClient, graphql_endpoint};
#[cfg(test)]
pub use service::MockTurbotApi;
pub use service::TurbotApi;
pub use types::{AttachedResource, AttachedResources, Grant, SmartFolder, TurbotMetadata, TurbotResource};
