//! Diff-suppression predicates.
//!
//! After every read the state holds remote identifiers, while configuration
//! may name the same entity by one of its akas. These predicates decide when
//! such a pair is the same value.

use super::data::ResourceData;
use crate::helpers::format_json;

/// Returns a predicate that treats `new` as unchanged when it equals the
/// stored `old` value or appears in the cached aka list `akas_field`.
pub fn suppress_if_aka_matches(
    akas_field: &'static str,
) -> impl Fn(&str, &str, &ResourceData) -> bool {
    move |old: &str, new: &str, data: &ResourceData| old == new || data.get_list(akas_field).iter().any(|aka| aka == new)
}

/// Treats two JSON documents as unchanged when their canonical forms match.
/// Malformed input on either side is never suppressed.
#[must_use]
pub fn suppress_if_data_matches(old: &str, new: &str, _data: &ResourceData) -> bool {
    match (format_json("old", old), format_json("new", new)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_akas() -> ResourceData {
        let mut data = ResourceData::with_id("999");
        data.set(
            "parent_akas",
            vec![
                String::from("tmod:@turbot/turbot#/"),
                String::from("arn:turbot:::root"),
            ],
        );
        data
    }

    #[test]
    fn test_aka_suppression_matches_alias() {
        let suppress = suppress_if_aka_matches("parent_akas");
        assert!(suppress("171930", "tmod:@turbot/turbot#/", &with_akas()));
        assert!(suppress("171930", "arn:turbot:::root", &with_akas()));
    }

    #[test]
    fn test_aka_suppression_matches_stored_id() {
        let suppress = suppress_if_aka_matches("parent_akas");
        assert!(suppress("171930", "171930", &with_akas()));
    }

    #[test]
    fn test_aka_suppression_rejects_other() {
        let suppress = suppress_if_aka_matches("parent_akas");
        assert!(!suppress("171930", "tmod:@turbot/aws#/", &with_akas()));
        assert!(!suppress("171930", "tmod:@turbot/turbot#/", &ResourceData::new()));
    }

    #[test]
    fn test_data_suppression() {
        let data = ResourceData::new();
        assert!(suppress_if_data_matches(r#"{"a":1,"b":2}"#, r#"{ "b": 2, "a": 1 }"#, &data));
        assert!(!suppress_if_data_matches(r#"{"a":1}"#, r#"{"a":2}"#, &data));
        assert!(!suppress_if_data_matches("{", "{", &data));
        assert!(suppress_if_data_matches("", "  ", &data));
        assert!(suppress_if_data_matches(r#"{"size":1}"#, r#"{"size": 1.0}"#, &data));
    }
}
