//! Static field tables for each resource kind.

use super::data::{FieldValue, ResourceData};
use super::suppress::{suppress_if_aka_matches, suppress_if_data_matches};

/// Shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// String field.
    String,
    /// List of strings.
    List,
    /// String to string map.
    Map,
}

/// How a field participates in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Must be configured.
    Required,
    /// May be configured.
    Optional,
    /// Set only by the provider.
    Computed,
}

/// Rule deciding when a configured value equals the stored one despite
/// differing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSuppress {
    /// Plain comparison.
    None,
    /// Id / aka equivalence using the named computed aka list.
    AkaMatches(&'static str),
    /// Canonical JSON comparison.
    DataMatches,
}

/// Schema of a single field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    /// Field name.
    pub name: &'static str,
    /// Value shape.
    pub field_type: FieldType,
    /// Configuration mode.
    pub mode: FieldMode,
    /// Changing the field replaces the resource.
    pub force_new: bool,
    /// Diff-suppression rule.
    pub diff_suppress: DiffSuppress,
}

impl FieldSchema {
    const fn new(name: &'static str, field_type: FieldType, mode: FieldMode) -> Self {
        Self {
            name,
            field_type,
            mode,
            force_new: false,
            diff_suppress: DiffSuppress::None,
        }
    }

    const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    const fn suppress(mut self, rule: DiffSuppress) -> Self {
        self.diff_suppress = rule;
        self
    }

    /// Returns true if a change from `old` to `new` should be ignored.
    #[must_use]
    pub fn suppresses(&self, old: &str, new: &str, data: &ResourceData) -> bool {
        match self.diff_suppress {
            DiffSuppress::None => false,
            DiffSuppress::AkaMatches(akas_field) => suppress_if_aka_matches(akas_field)(old, new, data),
            DiffSuppress::DataMatches => suppress_if_data_matches(old, new, data),
        }
    }

    /// Returns true if the value has the shape this field expects.
    #[must_use]
    pub const fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self.field_type, value),
            (FieldType::String, FieldValue::String(_))
                | (FieldType::List, FieldValue::List(_))
                | (FieldType::Map, FieldValue::Map(_))
        )
    }
}

/// Schema of a resource kind.
#[derive(Debug)]
pub struct ResourceSchema {
    /// Fields in declaration order.
    pub fields: &'static [FieldSchema],
    /// Whether the kind supports in-place updates.
    pub updatable: bool,
}

impl ResourceSchema {
    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterates the fields a user may configure.
    pub fn configurable(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.mode != FieldMode::Computed)
    }

    /// Iterates the required fields.
    pub fn required(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.mode == FieldMode::Required)
    }
}

/// Schema of the `file` resource.
pub static FILE_SCHEMA: ResourceSchema = ResourceSchema {
    fields: &[
        // state holds the parent id while configuration usually holds an aka
        FieldSchema::new("parent", FieldType::String, FieldMode::Required)
            .suppress(DiffSuppress::AkaMatches("parent_akas")),
        FieldSchema::new("parent_akas", FieldType::List, FieldMode::Computed),
        FieldSchema::new("title", FieldType::String, FieldMode::Required),
        FieldSchema::new("description", FieldType::String, FieldMode::Optional),
        FieldSchema::new("data", FieldType::String, FieldMode::Optional)
            .suppress(DiffSuppress::DataMatches),
        FieldSchema::new("metadata", FieldType::String, FieldMode::Optional)
            .suppress(DiffSuppress::DataMatches),
        FieldSchema::new("tags", FieldType::Map, FieldMode::Optional),
        FieldSchema::new("akas", FieldType::List, FieldMode::Optional),
    ],
    updatable: true,
};

/// Schema of the `grant` resource.
pub static GRANT_SCHEMA: ResourceSchema = ResourceSchema {
    fields: &[
        FieldSchema::new("resource", FieldType::String, FieldMode::Required)
            .force_new()
            .suppress(DiffSuppress::AkaMatches("resource_akas")),
        FieldSchema::new("type", FieldType::String, FieldMode::Required)
            .force_new()
            .suppress(DiffSuppress::AkaMatches("permission_type_akas")),
        FieldSchema::new("level", FieldType::String, FieldMode::Required)
            .force_new()
            .suppress(DiffSuppress::AkaMatches("permission_level_akas")),
        FieldSchema::new("identity", FieldType::String, FieldMode::Required)
            .force_new()
            .suppress(DiffSuppress::AkaMatches("identity_akas")),
        FieldSchema::new("resource_akas", FieldType::List, FieldMode::Computed),
        FieldSchema::new("permission_type_akas", FieldType::List, FieldMode::Computed),
        FieldSchema::new("permission_level_akas", FieldType::List, FieldMode::Computed),
        FieldSchema::new("identity_akas", FieldType::List, FieldMode::Computed),
    ],
    updatable: false,
};

/// Schema of the `smart_folder_attachment` resource.
pub static SMART_FOLDER_ATTACHMENT_SCHEMA: ResourceSchema = ResourceSchema {
    fields: &[
        FieldSchema::new("resource", FieldType::String, FieldMode::Required)
            .force_new()
            .suppress(DiffSuppress::AkaMatches("resource_akas")),
        FieldSchema::new("smart_folder", FieldType::String, FieldMode::Required).force_new(),
        FieldSchema::new("resource_akas", FieldType::List, FieldMode::Computed),
    ],
    updatable: false,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_schema_fields() {
        assert!(FILE_SCHEMA.updatable);
        assert_eq!(
            FILE_SCHEMA.field("parent").map(|f| f.diff_suppress),
            Some(DiffSuppress::AkaMatches("parent_akas"))
        );
        let required: Vec<_> = FILE_SCHEMA.required().map(|f| f.name).collect();
        assert_eq!(required, vec!["parent", "title"]);
        assert!(FILE_SCHEMA.configurable().all(|f| f.name != "parent_akas"));
    }

    #[test]
    fn test_grant_fields_force_new() {
        assert!(!GRANT_SCHEMA.updatable);
        assert!(GRANT_SCHEMA.configurable().all(|f| f.force_new));
    }

    #[test]
    fn test_accepts() {
        let title = FILE_SCHEMA.field("title").unwrap();
        assert!(title.accepts(&FieldValue::from("x")));
        assert!(!title.accepts(&FieldValue::List(vec![])));
    }
}
