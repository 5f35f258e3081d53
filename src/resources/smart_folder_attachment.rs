//! Handler for smart-folder attachments.
//!
//! An attachment has no remote id. Its local id is the composite
//! `"<smart_folder>_<resource>"` key built by [`build_id`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::TurbotApi;
use crate::error::{ResourceError, Result};
use crate::helpers::{build_id, map_from_resource_data_with_property_map, parse_id};
use crate::schema::ResourceData;

use super::{ResourceHandler, ResourceKind, clear_if_not_found, store_akas};

/// Field name to mutation input key.
const ATTACH_PROPERTIES: &[(&str, &str)] = &[("resource", "resource"), ("smart_folder", "smartFolders")];

/// Handler for `smart_folder_attachment` resources.
pub struct SmartFolderAttachmentHandler<'a> {
    client: &'a dyn TurbotApi,
}

impl<'a> SmartFolderAttachmentHandler<'a> {
    /// Creates an attachment handler.
    #[must_use]
    pub const fn new(client: &'a dyn TurbotApi) -> Self {
        Self { client }
    }
}

/// Builds the attach/detach input. The mutation takes a list of folders.
fn attach_input(data: &ResourceData) -> serde_json::Map<String, Value> {
    let mut input = map_from_resource_data_with_property_map(data, ATTACH_PROPERTIES);
    if let Some(folder) = input.remove("smartFolders") {
        input.insert(String::from("smartFolders"), Value::Array(vec![folder]));
    }
    input
}

#[async_trait]
impl ResourceHandler for SmartFolderAttachmentHandler<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::SmartFolderAttachment
    }

    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let resource = data.get_str("resource").to_string();
        let smart_folder = data.get_str("smart_folder").to_string();

        self.client
            .create_smart_folder_attachment(attach_input(data))
            .await?;
        info!("Attached {resource} to smart folder {smart_folder}");
        data.set_id(build_id(&smart_folder, &resource));

        store_akas(self.client, &resource, "resource_akas", data).await?;
        data.set("resource", resource);
        data.set("smart_folder", smart_folder);
        Ok(())
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        let (smart_folder, resource) = parse_id(data.id())?;

        let remote = match self.client.read_resource(&resource, None).await {
            Ok(remote) => remote,
            Err(e) => return Err(clear_if_not_found(data, e)),
        };

        store_akas(self.client, &remote.turbot.id, "resource_akas", data).await?;
        data.set("resource", resource);
        data.set("smart_folder", smart_folder);
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        if data.get_ok("resource").is_none() || data.get_ok("smart_folder").is_none() {
            let (smart_folder, resource) = parse_id(data.id())?;
            data.set("resource", resource);
            data.set("smart_folder", smart_folder);
        }

        self.client
            .delete_smart_folder_attachment(attach_input(data))
            .await?;
        info!("Detached smart folder attachment {}", data.id());
        data.set_id("");
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool> {
        let (smart_folder_id, resource) = parse_id(data.id())?;

        let smart_folder = match self.client.read_smart_folder(&smart_folder_id).await {
            Ok(folder) => folder,
            Err(e) if e.is_not_found() => {
                debug!("Smart folder {smart_folder_id} not found");
                return Ok(false);
            }
            Err(e) => return Err(ResourceError::remote("error reading smart folder", e).into()),
        };

        Ok(smart_folder.has_attached(&resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        AttachedResource, AttachedResources, MockTurbotApi, SmartFolder, TurbotMetadata,
        TurbotResource,
    };
    use crate::error::{ApiError, TurbotError};
    use mockall::predicate::eq;

    fn attachment_config() -> ResourceData {
        let mut data = ResourceData::new();
        data.set("resource", "204817");
        data.set("smart_folder", "171930");
        data
    }

    fn folder_with(id: &str, akas: &[&str]) -> SmartFolder {
        SmartFolder {
            turbot: TurbotMetadata {
                id: String::from("171930"),
                ..TurbotMetadata::default()
            },
            attached_resources: AttachedResources {
                items: vec![AttachedResource {
                    turbot: TurbotMetadata {
                        id: id.to_string(),
                        akas: akas.iter().map(ToString::to_string).collect(),
                        ..TurbotMetadata::default()
                    },
                }],
            },
        }
    }

    #[test]
    fn test_attach_input_wraps_folder_in_list() {
        let input = attach_input(&attachment_config());
        assert_eq!(input["resource"], Value::from("204817"));
        assert_eq!(input["smartFolders"], serde_json::json!(["171930"]));
    }

    #[tokio::test]
    async fn test_create_builds_composite_id() {
        let mut client = MockTurbotApi::new();
        client
            .expect_create_smart_folder_attachment()
            .times(1)
            .returning(|_| Ok(TurbotMetadata::default()));
        client
            .expect_get_resource_akas()
            .with(eq("204817"))
            .returning(|_| Ok(vec![String::from("arn:aws:s3:::bucket")]));

        let mut data = attachment_config();
        SmartFolderAttachmentHandler::new(&client)
            .create(&mut data)
            .await
            .unwrap();

        assert_eq!(data.id(), "171930_204817");
        assert_eq!(data.get_list("resource_akas"), ["arn:aws:s3:::bucket"]);
    }

    #[tokio::test]
    async fn test_import_populates_fields_from_id() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_resource()
            .withf(|id, properties| id == "204817" && properties.is_none())
            .returning(|id, _| {
                Ok(TurbotResource {
                    turbot: TurbotMetadata {
                        id: id.to_string(),
                        ..TurbotMetadata::default()
                    },
                    ..TurbotResource::default()
                })
            });
        client
            .expect_get_resource_akas()
            .returning(|_| Ok(vec![String::from("arn:aws:s3:::bucket")]));

        let mut data = ResourceData::with_id("171930_204817");
        SmartFolderAttachmentHandler::new(&client)
            .import(&mut data)
            .await
            .unwrap();

        assert_eq!(data.get_str("smart_folder"), "171930");
        assert_eq!(data.get_str("resource"), "204817");
    }

    #[tokio::test]
    async fn test_read_not_found_clears_id() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_resource()
            .returning(|id, _| Err(ApiError::not_found("Resource", id).into()));

        let mut data = ResourceData::with_id("171930_204817");
        let err = SmartFolderAttachmentHandler::new(&client)
            .read(&mut data)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!data.has_id());
    }

    #[tokio::test]
    async fn test_read_rejects_malformed_id() {
        let client = MockTurbotApi::new();
        let mut data = ResourceData::with_id("204817");
        let err = SmartFolderAttachmentHandler::new(&client)
            .read(&mut data)
            .await
            .unwrap_err();
        assert!(matches!(err, TurbotError::Resource(ResourceError::InvalidId { .. })));
    }

    #[tokio::test]
    async fn test_exists_matches_by_id_or_aka() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_smart_folder()
            .with(eq("171930"))
            .returning(|_| Ok(folder_with("204817", &["arn:aws:s3:::bucket"])));

        let handler = SmartFolderAttachmentHandler::new(&client);
        assert!(handler.exists(&ResourceData::with_id("171930_204817")).await.unwrap());
        assert!(
            handler
                .exists(&ResourceData::with_id("171930_arn:aws:s3:::bucket"))
                .await
                .unwrap()
        );
        assert!(!handler.exists(&ResourceData::with_id("171930_999")).await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_wraps_remote_errors() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_smart_folder()
            .returning(|_| Err(ApiError::request(500, "boom").into()));

        let err = SmartFolderAttachmentHandler::new(&client)
            .exists(&ResourceData::with_id("171930_204817"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("error reading smart folder"));
    }

    #[tokio::test]
    async fn test_delete_falls_back_to_id() {
        let mut client = MockTurbotApi::new();
        client
            .expect_delete_smart_folder_attachment()
            .withf(|input| {
                input["resource"] == Value::from("204817")
                    && input["smartFolders"] == serde_json::json!(["171930"])
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut data = ResourceData::with_id("171930_204817");
        SmartFolderAttachmentHandler::new(&client)
            .delete(&mut data)
            .await
            .unwrap();
        assert!(!data.has_id());
    }
}
