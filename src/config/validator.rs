//! Configuration validation for resource files.
//!
//! This module validates a configuration against the static schema of each
//! resource kind before anything is sent to Turbot.

use crate::error::{ConfigError, Result, TurbotError};
use crate::helpers::ID_SEPARATOR;
use crate::resources::{ResourceKind, check_file_config};
use crate::schema::FieldMode;
use std::collections::HashSet;
use tracing::debug;

use super::spec::{ProviderConfig, ResourceConfig};

/// Validator for provider configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a provider configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &ProviderConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(TurbotError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Runs every check and collects all errors and warnings.
    #[must_use]
    pub fn check(&self, config: &ProviderConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_workspace(config, &mut result);
        Self::validate_resources(&config.resources, &mut result);

        result
    }

    fn validate_workspace(config: &ProviderConfig, result: &mut ValidationResult) {
        if let Some(url) = &config.workspace.url
            && !url.starts_with("https://") && !url.starts_with("http://") {
                result.errors.push(ValidationError {
                    field: String::from("workspace.url"),
                    message: format!("Workspace URL must start with https:// ({url})"),
                });
            }

        if config.workspace.profile.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("workspace.profile"),
                message: String::from("Profile name cannot be empty"),
            });
        }
    }

    fn validate_resources(resources: &[ResourceConfig], result: &mut ValidationResult) {
        if resources.is_empty() {
            result.warnings.push(String::from("No resources defined in configuration"));
            return;
        }

        let mut seen_names = HashSet::new();

        for (i, resource) in resources.iter().enumerate() {
            let prefix = format!("resources[{i}]");

            if seen_names.contains(&resource.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate resource name: {}", resource.name),
                });
            } else {
                seen_names.insert(&resource.name);
            }

            if !is_valid_name(&resource.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!(
                        "Resource name '{}' is invalid. Must be lowercase alphanumeric with hyphens or underscores.",
                        resource.name
                    ),
                });
            }

            Self::validate_fields(resource, &prefix, result);

            match resource.kind {
                ResourceKind::File => Self::validate_file(resource, &prefix, result),
                ResourceKind::SmartFolderAttachment => {
                    Self::validate_attachment(resource, &prefix, result);
                }
                ResourceKind::Grant => {}
            }
        }
    }

    /// Checks fields against the kind's schema.
    fn validate_fields(resource: &ResourceConfig, prefix: &str, result: &mut ValidationResult) {
        let schema = resource.kind.schema();

        for field in schema.required() {
            if resource.fields.get(field.name).is_none_or(|v| v.is_empty()) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.fields.{}", field.name),
                    message: format!("'{}' is required for {}", field.name, resource.kind),
                });
            }
        }

        for (name, value) in &resource.fields {
            let path = format!("{prefix}.fields.{name}");
            match schema.field(name) {
                None => result.errors.push(ValidationError {
                    field: path,
                    message: format!("Unknown field '{name}' for {}", resource.kind),
                }),
                Some(field) if field.mode == FieldMode::Computed => {
                    result.errors.push(ValidationError {
                        field: path,
                        message: format!("'{name}' is computed and cannot be configured"),
                    });
                }
                Some(field) if !field.accepts(value) => {
                    result.errors.push(ValidationError {
                        field: path,
                        message: format!("'{name}' must be a {:?}", field.field_type),
                    });
                }
                Some(_) => {}
            }
        }
    }

    /// Checks JSON documents and the metadata conflict rule.
    fn validate_file(resource: &ResourceConfig, prefix: &str, result: &mut ValidationResult) {
        if let Err(e) = check_file_config(&resource.to_resource_data()) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.fields"),
                message: e.to_string(),
            });
        }
    }

    /// The smart folder is the left side of the composite id, so it must not
    /// contain the separator.
    fn validate_attachment(resource: &ResourceConfig, prefix: &str, result: &mut ValidationResult) {
        let data = resource.to_resource_data();
        let smart_folder = data.get_str("smart_folder");
        if smart_folder.contains(ID_SEPARATOR) {
            result.errors.push(ValidationError {
                field: format!("{prefix}.fields.smart_folder"),
                message: format!(
                    "Smart folder reference '{smart_folder}' cannot contain '{ID_SEPARATOR}'; use its numeric id"
                ),
            });
        }
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens or underscores,
/// starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn parse(yaml: &str) -> ProviderConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("readme"));
        assert!(is_valid_name("ops-admin_2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Readme"));
        assert!(!is_valid_name("1readme"));
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r#"
resources:
  - name: readme
    kind: file
    fields:
      parent: "tmod:@turbot/turbot#/"
      title: Readme
      metadata: '{"title": "Readme"}'
"#,
        );
        let result = ConfigValidator::new().validate(&config).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_missing_required_and_unknown_fields() {
        let config = parse(
            r"
resources:
  - name: ops-admin
    kind: grant
    fields:
      resource: x
      colour: blue
",
        );
        let result = ConfigValidator::new().check(&config);
        // identity, type, level missing; colour unknown
        assert_eq!(result.error_count(), 4);
        assert!(result.errors.iter().any(|e| e.field.ends_with("colour")));
    }

    #[test]
    fn test_duplicate_names_and_computed_fields() {
        let config = parse(
            r#"
resources:
  - name: a
    kind: smart_folder_attachment
    fields: { resource: "1", smart_folder: "2", resource_akas: ["x"] }
  - name: a
    kind: smart_folder_attachment
    fields: { resource: "1", smart_folder: "3" }
"#,
        );
        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.error_count(), 2);
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_file_metadata_conflict() {
        let config = parse(
            r#"
resources:
  - name: readme
    kind: file
    fields:
      parent: "tmod:@turbot/turbot#/"
      title: X
      metadata: '{"title": "Y"}'
"#,
        );
        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.error_count(), 1);
        assert!(result.errors[0].message.contains("title"));
    }

    #[test]
    fn test_attachment_folder_with_separator() {
        let config = parse(
            r#"
resources:
  - name: baseline
    kind: smart_folder_attachment
    fields: { resource: "1", smart_folder: "my_folder" }
"#,
        );
        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn test_empty_config_warns() {
        let result = ConfigValidator::new().check(&ProviderConfig::default());
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }
}
