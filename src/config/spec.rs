//! Configuration types for the provider.
//!
//! This module defines the structs that map to the `turbot.yaml` file: the
//! workspace to talk to, where local state lives and the desired resources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::resources::ResourceKind;
use crate::schema::{FieldValue, ResourceData};

/// Default location of the local state file.
pub const DEFAULT_STATE_PATH: &str = ".turbot/state.json";

/// Default credentials profile.
pub const DEFAULT_PROFILE: &str = "default";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Workspace connection settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// Local state settings.
    #[serde(default)]
    pub state: StateConfig,
    /// Desired resources.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// Workspace connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Workspace URL, e.g. `https://example.cloud.turbot.com`.
    #[serde(default)]
    pub url: Option<String>,
    /// Credentials profile name.
    #[serde(default = "default_profile")]
    pub profile: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            url: None,
            profile: default_profile(),
        }
    }
}

fn default_profile() -> String {
    String::from(DEFAULT_PROFILE)
}

/// Local state settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateConfig {
    /// State file path, relative to the configuration file.
    #[serde(default)]
    pub path: Option<String>,
}

impl StateConfig {
    /// Returns the configured state path or the default.
    #[must_use]
    pub fn path_or_default(&self) -> PathBuf {
        PathBuf::from(self.path.as_deref().unwrap_or(DEFAULT_STATE_PATH))
    }
}

/// A single desired resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Unique name within the configuration.
    pub name: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Configured field values.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl ResourceConfig {
    /// Returns the configured fields as handler input.
    #[must_use]
    pub fn to_resource_data(&self) -> ResourceData {
        ResourceData::from_fields(self.fields.clone())
    }
}

/// Resolved workspace credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Workspace URL.
    pub workspace: String,
    /// Access key.
    pub access_key: String,
    /// Secret key.
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("workspace", &self.workspace)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.workspace.profile, DEFAULT_PROFILE);
        assert_eq!(config.state.path_or_default(), PathBuf::from(DEFAULT_STATE_PATH));
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_resource_fields_deserialize_by_shape() {
        let yaml = r#"
name: readme
kind: file
fields:
  parent: "tmod:@turbot/turbot#/"
  akas: ["my-file"]
  tags:
    team: ops
"#;
        let resource: ResourceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(resource.kind, ResourceKind::File);

        let data = resource.to_resource_data();
        assert_eq!(data.get_str("parent"), "tmod:@turbot/turbot#/");
        assert_eq!(data.get_list("akas"), ["my-file"]);
        assert!(matches!(data.get("tags"), Some(FieldValue::Map(_))));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let credentials = Credentials {
            workspace: String::from("https://example.cloud.turbot.com"),
            access_key: String::from("ak"),
            secret_key: String::from("very-secret"),
        };
        assert!(!format!("{credentials:?}").contains("very-secret"));
    }
}
