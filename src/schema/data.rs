//! Generic field accessor shared by every resource handler.
//!
//! `ResourceData` holds the identity of a resource plus its named fields.
//! Handlers read configuration through it and write reconciled remote state
//! back into it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a single resource field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain string.
    String(String),
    /// Ordered list of strings.
    List(Vec<String>),
    /// String to string mapping.
    Map(BTreeMap<String, String>),
}

impl FieldValue {
    /// Returns true for the zero value of the variant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::String(s) => s.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Map(m) => m.is_empty(),
        }
    }

    /// Returns the string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list content, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Converts the value into a JSON value for mutation inputs.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(l) => serde_json::json!(l),
            Self::Map(m) => serde_json::json!(m),
        }
    }

    /// Renders the value for plan output.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::List(l) => format!("[{}]", l.join(", ")),
            Self::Map(m) => {
                let pairs: Vec<String> = m.iter().map(|(k, v)| format!("{k}={v}")).collect();
                format!("{{{}}}", pairs.join(", "))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, String>> for FieldValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Map(value)
    }
}

/// Identity and fields of a single resource instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Remote identity; empty when the resource does not exist.
    #[serde(default)]
    id: String,
    /// Named fields.
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

impl ResourceData {
    /// Creates an empty resource with no identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resource from a set of configured fields.
    #[must_use]
    pub const fn from_fields(fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            id: String::new(),
            fields,
        }
    }

    /// Creates a resource with only an identity, as used by import.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Returns the remote identity (empty when absent).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets the remote identity. An empty string clears it.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Returns true if the resource currently has a remote identity.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Returns the raw field value, whether or not it is empty.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the field only if it is present and non-empty.
    #[must_use]
    pub fn get_ok(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|v| !v.is_empty())
    }

    /// Returns a string field, or `""` when unset.
    #[must_use]
    pub fn get_str(&self, name: &str) -> &str {
        self.fields
            .get(name)
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
    }

    /// Returns a string field only if present and non-empty.
    #[must_use]
    pub fn get_str_ok(&self, name: &str) -> Option<&str> {
        self.get_ok(name).and_then(FieldValue::as_str)
    }

    /// Returns a list field, or an empty slice when unset.
    #[must_use]
    pub fn get_list(&self, name: &str) -> &[String] {
        self.fields
            .get(name)
            .and_then(FieldValue::as_list)
            .unwrap_or_default()
    }

    /// Sets a field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns all fields.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_ok_distinguishes_presence() {
        let mut data = ResourceData::new();
        data.set("title", "");
        data.set("description", "hello");

        assert!(data.get("title").is_some());
        assert!(data.get_ok("title").is_none());
        assert_eq!(data.get_str_ok("description"), Some("hello"));
        assert!(data.get_ok("missing").is_none());
        assert_eq!(data.get_str("missing"), "");
    }

    #[test]
    fn test_identity() {
        let mut data = ResourceData::with_id("123");
        assert!(data.has_id());
        data.set_id("");
        assert!(!data.has_id());
    }

    #[test]
    fn test_list_and_map_values() {
        let mut data = ResourceData::new();
        data.set("akas", vec![String::from("a"), String::from("b")]);
        let mut tags = BTreeMap::new();
        tags.insert(String::from("env"), String::from("prod"));
        data.set("tags", tags);

        assert_eq!(data.get_list("akas").len(), 2);
        assert_eq!(
            data.get("tags").map(FieldValue::display),
            Some(String::from("{env=prod}"))
        );
        assert_eq!(
            data.get("akas").map(FieldValue::to_json),
            Some(serde_json::json!(["a", "b"]))
        );
    }
}
