//! Property tests for JSON canonicalization and composite ids.

use proptest::prelude::*;
use serde_json::Value;

use turbot_provider::helpers::{build_id, format_json, parse_id};
use turbot_provider::schema::{ResourceData, suppress_if_data_matches};

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,8}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn object_entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z]{1,6}", json_value(), 1..6)
        .prop_map(|m| m.into_iter().collect())
}

fn object_text<'a>(entries: impl Iterator<Item = &'a (String, Value)>) -> String {
    let members: Vec<String> = entries
        .map(|(key, value)| format!("{}: {value}", Value::from(key.as_str())))
        .collect();
    format!("{{ {} }}", members.join(", "))
}

proptest! {
    #[test]
    fn canonical_form_is_idempotent(value in json_value()) {
        let once = format_json("data", &value.to_string()).unwrap();
        let twice = format_json("data", &once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn whitespace_does_not_matter(value in json_value()) {
        let pretty = serde_json::to_string_pretty(&value).unwrap();
        let compact = serde_json::to_string(&value).unwrap();
        prop_assert_eq!(format_json("data", &pretty).unwrap(), format_json("data", &compact).unwrap());
        prop_assert!(suppress_if_data_matches(&pretty, &compact, &ResourceData::new()));
    }

    #[test]
    fn key_order_does_not_matter(entries in object_entries()) {
        let forward = object_text(entries.iter());
        let reversed = object_text(entries.iter().rev());
        prop_assert_eq!(format_json("data", &forward).unwrap(), format_json("data", &reversed).unwrap());
    }

    #[test]
    fn composite_id_round_trips(folder in "[a-z0-9]{1,12}", resource in "[a-z0-9_:/.-]{1,24}") {
        let id = build_id(&folder, &resource);
        let (parsed_folder, parsed_resource) = parse_id(&id).unwrap();
        prop_assert_eq!(parsed_folder, folder);
        prop_assert_eq!(parsed_resource, resource);
    }
}

#[test]
fn malformed_json_is_never_suppressed() {
    assert!(!suppress_if_data_matches("{", "{", &ResourceData::new()));
    assert!(!suppress_if_data_matches("{\"a\": 1}", "not json", &ResourceData::new()));
}
