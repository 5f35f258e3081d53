//! Resource lifecycle handlers.
//!
//! Each handler maps configured fields onto Turbot mutations and queries and
//! copies the remote state back into the [`ResourceData`] it was given.
//! Every handler follows the same lifecycle:
//!
//! `absent -> created -> read-reconciled <-> updated -> deleted -> absent`
//!
//! `exists` is a side query used before read or import to decide whether the
//! local identity should be dropped.

mod akas;
mod file;
mod grant;
mod smart_folder_attachment;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::TurbotApi;
use crate::error::{ResourceError, Result};
use crate::schema::{
    FILE_SCHEMA, GRANT_SCHEMA, ResourceData, ResourceSchema, SMART_FOLDER_ATTACHMENT_SCHEMA,
};

pub use akas::store_akas;
pub use file::{FILE_RESOURCE_TYPE, FileHandler, check_file_config};
pub use grant::GrantHandler;
pub use smart_folder_attachment::SmartFolderAttachmentHandler;

/// Resource kinds handled by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A Turbot file resource.
    File,
    /// A permission grant.
    Grant,
    /// A resource attached to a smart folder.
    SmartFolderAttachment,
}

impl ResourceKind {
    /// All kinds.
    pub const ALL: [Self; 3] = [Self::File, Self::Grant, Self::SmartFolderAttachment];

    /// Returns the field schema of this kind.
    #[must_use]
    pub fn schema(self) -> &'static ResourceSchema {
        match self {
            Self::File => &FILE_SCHEMA,
            Self::Grant => &GRANT_SCHEMA,
            Self::SmartFolderAttachment => &SMART_FOLDER_ATTACHMENT_SCHEMA,
        }
    }

    /// Returns the configuration name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Grant => "grant",
            Self::SmartFolderAttachment => "smart_folder_attachment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ResourceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ResourceError::UnsupportedKind {
                kind: s.to_string(),
            })
    }
}

/// Lifecycle callbacks for one resource kind.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The kind this handler manages.
    fn kind(&self) -> ResourceKind;

    /// Creates the remote entity from configured fields and assigns the id.
    async fn create(&self, data: &mut ResourceData) -> Result<()>;

    /// Refreshes fields from the remote entity. Clears the id and returns the
    /// error when the entity no longer exists.
    async fn read(&self, data: &mut ResourceData) -> Result<()>;

    /// Applies configured changes to the remote entity.
    async fn update(&self, data: &mut ResourceData) -> Result<()> {
        let _ = data;
        Err(ResourceError::UpdateNotSupported {
            kind: self.kind().to_string(),
        }
        .into())
    }

    /// Deletes the remote entity and clears the id.
    async fn delete(&self, data: &mut ResourceData) -> Result<()>;

    /// Returns whether the remote entity still exists.
    async fn exists(&self, data: &ResourceData) -> Result<bool>;

    /// Populates every field from an externally supplied id.
    async fn import(&self, data: &mut ResourceData) -> Result<()> {
        self.read(data).await
    }
}

/// Returns the handler for a resource kind.
#[must_use]
pub fn handler_for<'a>(kind: ResourceKind, client: &'a dyn TurbotApi) -> Box<dyn ResourceHandler + 'a> {
    match kind {
        ResourceKind::File => Box::new(FileHandler::new(client)),
        ResourceKind::Grant => Box::new(GrantHandler::new(client)),
        ResourceKind::SmartFolderAttachment => Box::new(SmartFolderAttachmentHandler::new(client)),
    }
}

/// Clears the local identity when `err` reports a missing entity, then hands
/// the error back.
pub(crate) fn clear_if_not_found(data: &mut ResourceData, err: crate::error::TurbotError) -> crate::error::TurbotError {
    if err.is_not_found() {
        tracing::info!("Resource {} no longer exists, clearing id", data.id());
        data.set_id("");
    }
    err
}
