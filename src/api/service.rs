//! Remote operations the resource handlers depend on.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::Result;

use super::types::{Grant, SmartFolder, TurbotMetadata, TurbotResource};

/// Operations exposed by the Turbot API, per entity kind.
///
/// Every lookup of a missing entity fails with
/// [`ApiError::NotFound`](crate::error::ApiError::NotFound).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TurbotApi: Send + Sync {
    /// Returns whether a resource with this id or aka exists.
    async fn resource_exists(&self, id: &str) -> Result<bool>;

    /// Reads a resource. When `properties` is given (`name -> path`), only
    /// those data properties are fetched.
    async fn read_resource(
        &self,
        id: &str,
        properties: Option<BTreeMap<String, String>>,
    ) -> Result<TurbotResource>;

    /// Creates a resource and returns its metadata.
    async fn create_resource(&self, input: Map<String, Value>) -> Result<TurbotMetadata>;

    /// Updates a resource and returns its metadata.
    async fn update_resource(&self, input: Map<String, Value>) -> Result<TurbotMetadata>;

    /// Deletes a resource.
    async fn delete_resource(&self, id: &str) -> Result<()>;

    /// Returns the property names declared by the update schema of the
    /// resource's type.
    async fn read_update_schema_properties(&self, id: &str) -> Result<Vec<String>>;

    /// Returns the akas of the entity identified by an id or aka.
    async fn get_resource_akas(&self, id: &str) -> Result<Vec<String>>;

    /// Returns whether a grant exists.
    async fn grant_exists(&self, id: &str) -> Result<bool>;

    /// Reads a grant.
    async fn read_grant(&self, id: &str) -> Result<Grant>;

    /// Creates a grant and returns its metadata.
    async fn create_grant(&self, input: Map<String, Value>) -> Result<TurbotMetadata>;

    /// Deletes a grant.
    async fn delete_grant(&self, id: &str) -> Result<()>;

    /// Reads a smart folder with its attached resources.
    async fn read_smart_folder(&self, id: &str) -> Result<SmartFolder>;

    /// Attaches a resource to smart folders.
    async fn create_smart_folder_attachment(
        &self,
        input: Map<String, Value>,
    ) -> Result<TurbotMetadata>;

    /// Detaches a resource from smart folders.
    async fn delete_smart_folder_attachment(&self, input: Map<String, Value>) -> Result<()>;
}
