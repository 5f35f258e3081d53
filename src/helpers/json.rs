//! JSON helpers for the `data` and `metadata` fields.
//!
//! Both fields are carried as JSON strings in configuration and state. They
//! are written back in canonical form (compact, object keys sorted at every
//! depth, integral numbers written without a fraction) so that reordering
//! keys, whitespace or `1.0` against `1` never shows up as a change.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::error::{ResourceError, Result};

/// Largest magnitude below which every integer is exactly representable as `f64`.
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Returns the canonical textual form of the JSON document held by `field`.
///
/// Empty or whitespace-only input maps to `""`.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidJson`] naming `field` if the input is not
/// valid JSON.
pub fn format_json(field: &str, input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Ok(String::new());
    }
    let value: Value = serde_json::from_str(input)
        .map_err(|e| ResourceError::invalid_json(field, input, e.to_string()))?;
    Ok(canonical_value(&value).to_string())
}

/// Rebuilds a value with every object's keys inserted in sorted order and
/// integral floats (`1.0`, `1e2`) rewritten as integers.
#[must_use]
pub fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let mut out = Map::new();
            for (key, inner) in sorted {
                out.insert(key.clone(), canonical_value(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        Value::Number(number) => Value::Number(canonical_number(number)),
        other => other.clone(),
    }
}

#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn canonical_number(number: &Number) -> Number {
    if number.is_f64()
        && let Some(float) = number.as_f64()
        && float.trunc() == float
        && float.abs() < MAX_EXACT_FLOAT_INTEGER
    {
        return Number::from(float as i64);
    }
    number.clone()
}

/// Parses a JSON object string into a map. Empty input gives an empty map.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidJson`] if the input is malformed or not an object.
pub fn json_string_to_map(field: &str, input: &str) -> Result<Map<String, Value>> {
    if input.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ResourceError::invalid_json(
            field,
            input,
            format!("expected a JSON object, found {}", type_name(&other)),
        )
        .into()),
        Err(e) => Err(ResourceError::invalid_json(field, input, e.to_string()).into()),
    }
}

/// Serialises an object map into its canonical string form.
#[must_use]
pub fn map_to_json_string(map: &Map<String, Value>) -> String {
    canonical_value(&Value::Object(map.clone())).to_string()
}

/// Builds a `property name -> property path` map from the top-level keys of
/// a JSON object, used to request only configured properties on read.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidJson`] if the input is malformed or not an object.
pub fn property_map_from_json(field: &str, input: &str) -> Result<BTreeMap<String, String>> {
    let map = json_string_to_map(field, input)?;
    Ok(map.keys().map(|k| (k.clone(), k.clone())).collect())
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_json_sorts_keys() {
        let a = format_json("data", r#"{"b": 1, "a": {"d": 2, "c": [ {"y":1,"x":2} ]}}"#).unwrap();
        assert_eq!(a, r#"{"a":{"c":[{"x":2,"y":1}],"d":2},"b":1}"#);
    }

    #[test]
    fn test_format_json_key_order_independent() {
        let a = format_json("data", r#"{"name": "x", "size": 3}"#).unwrap();
        let b = format_json("data", "{\n  \"size\": 3,\n  \"name\": \"x\"\n}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_format_json_idempotent() {
        let once = format_json("data", r#"{"z": [3, 2, 1], "a": null}"#).unwrap();
        let twice = format_json("data", &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_format_json_empty() {
        assert_eq!(format_json("data", "").unwrap(), "");
        assert_eq!(format_json("data", "   ").unwrap(), "");
    }

    #[test]
    fn test_format_json_malformed() {
        let err = format_json("metadata", "{not json").unwrap_err();
        assert!(matches!(
            err,
            crate::error::TurbotError::Resource(ResourceError::InvalidJson { ref field, .. })
                if field == "metadata"
        ));
    }

    #[test]
    fn test_format_json_integral_numbers_match() {
        assert_eq!(
            format_json("data", r#"{"size": 1}"#).unwrap(),
            format_json("data", r#"{"size": 1.0}"#).unwrap()
        );
        assert_eq!(
            format_json("data", r#"{"limit": 1e2}"#).unwrap(),
            format_json("data", r#"{"limit": 100}"#).unwrap()
        );
        assert_eq!(format_json("data", "[1.0, -3.0, 2.5]").unwrap(), "[1,-3,2.5]");
    }

    #[test]
    fn test_json_string_to_map() {
        let map = json_string_to_map("data", r#"{"a": 1}"#).unwrap();
        assert_eq!(map.get("a"), Some(&Value::from(1)));

        assert!(json_string_to_map("data", "").unwrap().is_empty());
        assert!(json_string_to_map("data", "[1, 2]").is_err());
        assert!(json_string_to_map("data", "{").is_err());
    }

    #[test]
    fn test_map_to_json_string_is_canonical() {
        let map = json_string_to_map("data", r#"{"b": true, "a": "x"}"#).unwrap();
        assert_eq!(map_to_json_string(&map), r#"{"a":"x","b":true}"#);
    }

    #[test]
    fn test_property_map_from_json() {
        let props = property_map_from_json("data", r#"{"foo": 1, "bar": {"x": 1}}"#).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("foo").map(String::as_str), Some("foo"));
        assert_eq!(props.get("bar").map(String::as_str), Some("bar"));
    }
}
