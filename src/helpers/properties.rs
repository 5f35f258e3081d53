//! Builds mutation inputs from resource fields.

use serde_json::{Map, Value};

use crate::schema::ResourceData;

/// Copies every listed property that is set on `data` into an input map,
/// keeping the field name as the input key.
#[must_use]
pub fn map_from_resource_data(data: &ResourceData, properties: &[&str]) -> Map<String, Value> {
    let mut input = Map::new();
    for property in properties {
        if let Some(value) = data.get_ok(property) {
            input.insert((*property).to_string(), value.to_json());
        }
    }
    input
}

/// Copies every listed property that is set on `data` into an input map,
/// renaming fields through `(field, input key)` pairs.
#[must_use]
pub fn map_from_resource_data_with_property_map(
    data: &ResourceData,
    property_map: &[(&str, &str)],
) -> Map<String, Value> {
    let mut input = Map::new();
    for (field, key) in property_map {
        if let Some(value) = data.get_ok(field) {
            input.insert((*key).to_string(), value.to_json());
        }
    }
    input
}

/// Returns `properties` without the excluded names.
#[must_use]
pub fn remove_properties<'a>(properties: &[&'a str], excluded: &[&str]) -> Vec<&'a str> {
    properties
        .iter()
        .copied()
        .filter(|p| !excluded.contains(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_from_resource_data_skips_unset() {
        let mut data = ResourceData::new();
        data.set("parent", "tmod:@turbot/turbot#/");
        data.set("akas", Vec::<String>::new());

        let input = map_from_resource_data(&data, &["parent", "tags", "akas"]);
        assert_eq!(input.len(), 1);
        assert_eq!(input["parent"], Value::from("tmod:@turbot/turbot#/"));
    }

    #[test]
    fn test_map_with_property_map_renames() {
        let mut data = ResourceData::new();
        data.set("resource", "123");
        data.set("smart_folder", "456");

        let input = map_from_resource_data_with_property_map(
            &data,
            &[("resource", "resource"), ("smart_folder", "smartFolder")],
        );
        assert_eq!(input["resource"], Value::from("123"));
        assert_eq!(input["smartFolder"], Value::from("456"));
    }

    #[test]
    fn test_remove_properties() {
        let remaining = remove_properties(&["parent", "type", "tags", "akas"], &["type"]);
        assert_eq!(remaining, vec!["parent", "tags", "akas"]);
    }
}
