//! Handler for Turbot file resources.
//!
//! A file carries a JSON `data` document and a JSON `metadata` document.
//! `title` and `description` may be given at top level, inside `metadata`,
//! or both, in which case they must agree.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::api::TurbotApi;
use crate::error::{ResourceError, Result};
use crate::helpers::{
    format_json, json_string_to_map, map_from_resource_data, map_to_json_string,
    property_map_from_json, remove_properties,
};
use crate::schema::ResourceData;

use super::{ResourceHandler, ResourceKind, clear_if_not_found, store_akas};

/// Turbot type of file resources.
pub const FILE_RESOURCE_TYPE: &str = "tmod:@turbot/turbot#/resource/types/file";

/// Fields passed through to the create mutation.
const FILE_PROPERTIES: &[&str] = &["parent", "tags", "akas"];

/// Generic resource input fields; `type` is fixed at creation.
const RESOURCE_PROPERTIES: &[&str] = &["parent", "type", "tags", "akas"];

/// Properties that live both at top level and inside metadata.
const METADATA_PROPERTIES: &[&str] = &["title", "description"];

/// Handler for `file` resources.
pub struct FileHandler<'a> {
    client: &'a dyn TurbotApi,
}

impl<'a> FileHandler<'a> {
    /// Creates a file handler.
    #[must_use]
    pub const fn new(client: &'a dyn TurbotApi) -> Self {
        Self { client }
    }
}

fn update_properties() -> Vec<&'static str> {
    remove_properties(RESOURCE_PROPERTIES, &["type"])
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the mutation input and reconciles top-level properties with
/// metadata. Fails before any remote call on malformed JSON or conflicts.
fn build_file_input(data: &ResourceData, properties: &[&str]) -> Result<Map<String, Value>> {
    let mut input = map_from_resource_data(data, properties);

    let data_map = json_string_to_map("data", data.get_str("data"))?;
    input.insert(String::from("data"), Value::Object(data_map));

    let mut metadata = match data.get_str_ok("metadata") {
        Some(raw) => json_string_to_map("metadata", raw)?,
        None => Map::new(),
    };

    for property in METADATA_PROPERTIES {
        let Some(top_level) = data.get_str_ok(property) else {
            continue;
        };
        match metadata.get(*property) {
            Some(nested) if nested.as_str() != Some(top_level) => {
                return Err(ResourceError::Conflict {
                    property: (*property).to_string(),
                    top_level: top_level.to_string(),
                    metadata: value_to_string(nested),
                }
                .into());
            }
            Some(_) => {}
            None => {
                metadata.insert((*property).to_string(), Value::from(top_level));
            }
        }
    }

    if !metadata.is_empty() {
        input.insert(String::from("metadata"), Value::Object(metadata));
    }
    Ok(input)
}

/// Checks a file configuration the way create would, without any remote
/// call: `data` and `metadata` must be JSON objects and top-level
/// properties must agree with metadata.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidJson`] or [`ResourceError::Conflict`].
pub fn check_file_config(data: &ResourceData) -> Result<()> {
    build_file_input(data, FILE_PROPERTIES).map(|_| ())
}

/// Keeps only the data keys the update schema declares. An empty schema
/// leaves the data untouched.
fn filter_update_data(data: Map<String, Value>, allowed: &[String]) -> Map<String, Value> {
    if allowed.is_empty() {
        return data;
    }
    data.into_iter()
        .filter(|(key, _)| {
            let keep = allowed.iter().any(|a| a == key);
            if !keep {
                debug!("Dropping '{key}' from update: not in update schema");
            }
            keep
        })
        .collect()
}

/// Writes `data` and `metadata` back in canonical form.
fn store_canonical_json(data: &mut ResourceData) -> Result<()> {
    let canonical = format_json("data", data.get_str("data"))?;
    data.set("data", canonical);
    if let Some(raw) = data.get_str_ok("metadata") {
        let canonical = format_json("metadata", raw)?;
        data.set("metadata", canonical);
    }
    Ok(())
}

#[async_trait]
impl ResourceHandler for FileHandler<'_> {
    fn kind(&self) -> ResourceKind {
        ResourceKind::File
    }

    async fn create(&self, data: &mut ResourceData) -> Result<()> {
        let mut input = build_file_input(data, FILE_PROPERTIES)?;
        input.insert(String::from("type"), Value::from(FILE_RESOURCE_TYPE));

        let metadata = self.client.create_resource(input).await?;
        info!("Created file {}", metadata.id);
        data.set_id(metadata.id);

        store_akas(self.client, &metadata.parent_id, "parent_akas", data).await?;
        store_canonical_json(data)
    }

    async fn read(&self, data: &mut ResourceData) -> Result<()> {
        self.read_file(data, false).await
    }

    async fn update(&self, data: &mut ResourceData) -> Result<()> {
        let id = data.id().to_string();
        let mut input = build_file_input(data, &update_properties())?;

        let allowed = self.client.read_update_schema_properties(&id).await?;
        if let Some(Value::Object(data_map)) = input.remove("data") {
            input.insert(
                String::from("data"),
                Value::Object(filter_update_data(data_map, &allowed)),
            );
        }
        input.insert(String::from("id"), Value::from(id.as_str()));

        let metadata = match self.client.update_resource(input).await {
            Ok(metadata) => metadata,
            Err(e) => return Err(clear_if_not_found(data, e)),
        };
        info!("Updated file {id}");

        store_canonical_json(data)?;
        for property in METADATA_PROPERTIES {
            if let Some(value) = metadata.custom.get(*property) {
                data.set(*property, value_to_string(value));
            }
        }

        store_akas(self.client, &metadata.parent_id, "parent_akas", data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<()> {
        self.client.delete_resource(data.id()).await?;
        info!("Deleted file {}", data.id());
        data.set_id("");
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool> {
        self.client.resource_exists(data.id()).await
    }

    async fn import(&self, data: &mut ResourceData) -> Result<()> {
        self.read_file(data, true).await
    }
}

impl FileHandler<'_> {
    /// Reads the file and reconciles it into `data`. On import there is no
    /// configuration yet, so top-level properties are taken from metadata.
    async fn read_file(&self, data: &mut ResourceData, importing: bool) -> Result<()> {
        let id = data.id().to_string();

        let properties = data
            .get_str_ok("data")
            .map(|raw| property_map_from_json("data", raw))
            .transpose()?;
        let configured_metadata = data
            .get_str_ok("metadata")
            .map(|raw| property_map_from_json("metadata", raw))
            .transpose()?
            .unwrap_or_default();
        let data_configured = properties.is_some();

        let resource = match self.client.read_resource(&id, properties).await {
            Ok(resource) => resource,
            Err(e) => return Err(clear_if_not_found(data, e)),
        };

        let mut custom = resource.turbot.custom.clone();
        for property in METADATA_PROPERTIES {
            if let Some(remote) = custom.get(*property) {
                if importing || data.get_ok(property).is_some() {
                    data.set(*property, value_to_string(remote));
                }
                if !configured_metadata.contains_key(*property) {
                    custom.remove(*property);
                }
            }
        }

        store_akas(self.client, &resource.turbot.parent_id, "parent_akas", data).await?;

        data.set("parent", resource.turbot.parent_id.clone());
        if data_configured || !resource.data.is_empty() {
            data.set("data", map_to_json_string(&resource.data));
        }
        if configured_metadata.is_empty() && custom.is_empty() {
            data.set("metadata", String::new());
        } else {
            data.set("metadata", map_to_json_string(&custom));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockTurbotApi, TurbotMetadata, TurbotResource};
    use crate::error::{ApiError, TurbotError};
    use mockall::predicate::eq;

    fn file_config() -> ResourceData {
        let mut data = ResourceData::new();
        data.set("parent", "tmod:@turbot/turbot#/");
        data.set("title", "My file");
        data.set("data", r#"{"b": 2, "a": 1}"#);
        data
    }

    fn metadata(id: &str, parent: &str, custom: Value) -> TurbotMetadata {
        TurbotMetadata {
            id: id.to_string(),
            parent_id: parent.to_string(),
            custom: custom.as_object().cloned().unwrap_or_default(),
            ..TurbotMetadata::default()
        }
    }

    #[test]
    fn test_build_input_propagates_top_level_into_metadata() {
        let data = file_config();
        let input = build_file_input(&data, FILE_PROPERTIES).unwrap();

        assert_eq!(input["parent"], Value::from("tmod:@turbot/turbot#/"));
        assert_eq!(input["data"]["a"], Value::from(1));
        assert_eq!(input["metadata"]["title"], Value::from("My file"));
        assert!(input.get("type").is_none());
    }

    #[test]
    fn test_build_input_conflict() {
        let mut data = file_config();
        data.set("title", "X");
        data.set("metadata", r#"{"title": "Y"}"#);

        let err = build_file_input(&data, FILE_PROPERTIES).unwrap_err();
        assert!(matches!(
            err,
            TurbotError::Resource(ResourceError::Conflict { ref property, .. }) if property == "title"
        ));
    }

    #[test]
    fn test_canonical_json_error_names_field() {
        let mut data = file_config();
        data.set("metadata", "{broken");

        let err = store_canonical_json(&mut data).unwrap_err();
        assert!(matches!(
            err,
            TurbotError::Resource(ResourceError::InvalidJson { ref field, .. }) if field == "metadata"
        ));
    }

    #[test]
    fn test_build_input_non_string_metadata_conflicts() {
        let mut data = file_config();
        data.set("title", "5");
        data.set("metadata", r#"{"title": 5}"#);

        let err = build_file_input(&data, FILE_PROPERTIES).unwrap_err();
        assert!(matches!(
            err,
            TurbotError::Resource(ResourceError::Conflict { ref metadata, .. }) if metadata == "5"
        ));
    }

    #[test]
    fn test_build_input_matching_metadata_is_accepted() {
        let mut data = file_config();
        data.set("metadata", r#"{"title": "My file", "owner": "ops"}"#);

        let input = build_file_input(&data, FILE_PROPERTIES).unwrap();
        assert_eq!(input["metadata"]["owner"], Value::from("ops"));
        assert_eq!(input["metadata"]["title"], Value::from("My file"));
    }

    #[test]
    fn test_build_input_malformed_data() {
        let mut data = file_config();
        data.set("data", "{oops");
        let err = build_file_input(&data, FILE_PROPERTIES).unwrap_err();
        assert!(matches!(
            err,
            TurbotError::Resource(ResourceError::InvalidJson { ref field, .. }) if field == "data"
        ));
    }

    #[test]
    fn test_update_properties_exclude_type() {
        assert_eq!(update_properties(), vec!["parent", "tags", "akas"]);
    }

    #[test]
    fn test_filter_update_data() {
        let data = json_string_to_map("data", r#"{"a": 1, "b": 2}"#).unwrap();
        let filtered = filter_update_data(data.clone(), &[String::from("a")]);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("a"));

        let untouched = filter_update_data(data, &[]);
        assert_eq!(untouched.len(), 2);
    }

    #[tokio::test]
    async fn test_create_sets_id_and_canonical_data() {
        let mut client = MockTurbotApi::new();
        client
            .expect_create_resource()
            .withf(|input| {
                input["type"] == Value::from(FILE_RESOURCE_TYPE)
                    && input["metadata"]["title"] == Value::from("My file")
            })
            .times(1)
            .returning(|_| Ok(metadata("204817", "171930", serde_json::json!({"title": "My file"}))));
        client
            .expect_get_resource_akas()
            .with(eq("171930"))
            .returning(|_| Ok(vec![String::from("tmod:@turbot/turbot#/")]));

        let mut data = file_config();
        FileHandler::new(&client).create(&mut data).await.unwrap();

        assert_eq!(data.id(), "204817");
        assert_eq!(data.get_str("data"), r#"{"a":1,"b":2}"#);
        assert_eq!(data.get_list("parent_akas"), ["tmod:@turbot/turbot#/"]);
    }

    #[tokio::test]
    async fn test_create_conflict_makes_no_remote_call() {
        let client = MockTurbotApi::new();
        let mut data = file_config();
        data.set("metadata", r#"{"title": "Other"}"#);

        let err = FileHandler::new(&client).create(&mut data).await.unwrap_err();
        assert!(matches!(err, TurbotError::Resource(ResourceError::Conflict { .. })));
        assert!(!data.has_id());
    }

    #[tokio::test]
    async fn test_read_reconciles_metadata() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_resource()
            .withf(|id, properties| {
                id == "204817"
                    && properties
                        .as_ref()
                        .is_some_and(|p| p.contains_key("a") && p.contains_key("b"))
            })
            .returning(|_, _| {
                Ok(TurbotResource {
                    data: json_string_to_map("data", r#"{"b": 2, "a": 1}"#).unwrap(),
                    turbot: metadata(
                        "204817",
                        "171930",
                        serde_json::json!({"title": "Remote title", "description": "d", "owner": "ops"}),
                    ),
                })
            });
        client
            .expect_get_resource_akas()
            .returning(|_| Ok(vec![String::from("tmod:@turbot/turbot#/")]));

        let mut data = file_config();
        data.set_id("204817");
        data.set("metadata", r#"{"owner": "ops"}"#);
        FileHandler::new(&client).read(&mut data).await.unwrap();

        assert_eq!(data.get_str("title"), "Remote title");
        assert!(data.get_ok("description").is_none());
        assert_eq!(data.get_str("metadata"), r#"{"owner":"ops"}"#);
        assert_eq!(data.get_str("parent"), "171930");
        assert_eq!(data.get_str("data"), r#"{"a":1,"b":2}"#);
    }

    #[tokio::test]
    async fn test_read_not_found_clears_id() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_resource()
            .returning(|id, _| Err(ApiError::not_found("Resource", id).into()));

        let mut data = file_config();
        data.set_id("204817");
        let err = FileHandler::new(&client).read(&mut data).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(!data.has_id());
    }

    #[tokio::test]
    async fn test_update_filters_data_through_update_schema() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_update_schema_properties()
            .with(eq("204817"))
            .returning(|_| Ok(vec![String::from("a")]));
        client
            .expect_update_resource()
            .withf(|input| {
                input["id"] == Value::from("204817")
                    && input["data"].as_object().is_some_and(|d| d.len() == 1)
                    && input.get("type").is_none()
            })
            .times(1)
            .returning(|_| {
                Ok(metadata(
                    "204817",
                    "171930",
                    serde_json::json!({"title": "My file", "description": "new"}),
                ))
            });
        client
            .expect_get_resource_akas()
            .returning(|_| Ok(vec![String::from("tmod:@turbot/turbot#/")]));

        let mut data = file_config();
        data.set_id("204817");
        FileHandler::new(&client).update(&mut data).await.unwrap();

        assert_eq!(data.get_str("description"), "new");
        assert_eq!(data.get_str("data"), r#"{"a":1,"b":2}"#);
    }

    #[tokio::test]
    async fn test_delete_clears_id() {
        let mut client = MockTurbotApi::new();
        client
            .expect_delete_resource()
            .with(eq("204817"))
            .times(1)
            .returning(|_| Ok(()));

        let mut data = ResourceData::with_id("204817");
        FileHandler::new(&client).delete(&mut data).await.unwrap();
        assert!(!data.has_id());
    }

    #[tokio::test]
    async fn test_import_reads_everything() {
        let mut client = MockTurbotApi::new();
        client
            .expect_read_resource()
            .withf(|_, properties| properties.is_none())
            .returning(|_, _| {
                Ok(TurbotResource {
                    data: json_string_to_map("data", r#"{"x": true}"#).unwrap(),
                    turbot: metadata("204817", "171930", serde_json::json!({"title": "T"})),
                })
            });
        client
            .expect_get_resource_akas()
            .returning(|_| Ok(vec![String::from("tmod:@turbot/turbot#/")]));

        let mut data = ResourceData::with_id("204817");
        FileHandler::new(&client).import(&mut data).await.unwrap();

        assert_eq!(data.get_str("parent"), "171930");
        assert_eq!(data.get_str("title"), "T");
        assert_eq!(data.get_str("data"), r#"{"x":true}"#);
        assert_eq!(data.get_str("metadata"), "");
    }
}
