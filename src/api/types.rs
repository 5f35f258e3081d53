//! Turbot API types and data structures.
//!
//! This module defines the records returned by the Turbot GraphQL API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity metadata attached to every Turbot entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurbotMetadata {
    /// Entity identifier.
    #[serde(default)]
    pub id: String,
    /// Identifier of the parent resource.
    #[serde(default)]
    pub parent_id: String,
    /// Alternate identifiers.
    #[serde(default)]
    pub akas: Vec<String>,
    /// Custom metadata (title, description, ...).
    #[serde(default)]
    pub custom: Map<String, Value>,
    /// Identity a grant is assigned to.
    #[serde(default)]
    pub profile_id: String,
    /// Resource a grant or attachment targets.
    #[serde(default)]
    pub resource_id: String,
}

/// A Turbot resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurbotResource {
    /// Resource data.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Identity metadata.
    #[serde(default)]
    pub turbot: TurbotMetadata,
}

/// A permission grant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    /// Permission type identifier.
    #[serde(default)]
    pub permission_type_id: String,
    /// Permission level identifier.
    #[serde(default)]
    pub permission_level_id: String,
    /// Identity metadata; carries the profile and resource ids.
    #[serde(default)]
    pub turbot: TurbotMetadata,
}

/// A smart folder and the resources attached to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartFolder {
    /// Identity metadata.
    #[serde(default)]
    pub turbot: TurbotMetadata,
    /// Resources attached to the folder.
    #[serde(default)]
    pub attached_resources: AttachedResources,
}

/// Page of attached resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachedResources {
    /// Attached resources.
    #[serde(default)]
    pub items: Vec<AttachedResource>,
}

/// Resource attached to a smart folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachedResource {
    /// Identity metadata.
    #[serde(default)]
    pub turbot: TurbotMetadata,
}

impl TurbotMetadata {
    /// Returns true if `reference` is this entity's id or one of its akas.
    #[must_use]
    pub fn matches(&self, reference: &str) -> bool {
        self.id == reference || self.akas.iter().any(|aka| aka == reference)
    }
}

impl SmartFolder {
    /// Returns true if a resource matching `reference` (id or aka) is attached.
    #[must_use]
    pub fn has_attached(&self, reference: &str) -> bool {
        self.attached_resources
            .items
            .iter()
            .any(|item| item.turbot.matches(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_resource() {
        let json = serde_json::json!({
            "data": { "foo": "bar" },
            "turbot": {
                "id": "204817",
                "parentId": "171930",
                "akas": ["tmod:@turbot/turbot#/files/my_file"],
                "custom": { "title": "My file" }
            }
        });
        let resource: TurbotResource = serde_json::from_value(json).unwrap();
        assert_eq!(resource.turbot.id, "204817");
        assert_eq!(resource.turbot.parent_id, "171930");
        assert_eq!(resource.turbot.custom["title"], Value::from("My file"));
        assert_eq!(resource.data["foo"], Value::from("bar"));
    }

    #[test]
    fn test_smart_folder_has_attached() {
        let json = serde_json::json!({
            "turbot": { "id": "100" },
            "attachedResources": {
                "items": [
                    { "turbot": { "id": "200", "akas": ["arn:aws:::200"] } }
                ]
            }
        });
        let folder: SmartFolder = serde_json::from_value(json).unwrap();
        assert!(folder.has_attached("200"));
        assert!(folder.has_attached("arn:aws:::200"));
        assert!(!folder.has_attached("300"));
    }
}
