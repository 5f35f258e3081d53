//! Small pure helpers used by the resource handlers.
//!
//! - JSON canonicalisation for idempotent `data` / `metadata` comparison
//! - the composite identity codec used by attachments
//! - mutation input builders

pub mod id;
pub mod json;
pub mod properties;

pub use id::{ID_SEPARATOR, build_id, parse_id};
pub use json::{format_json, json_string_to_map, map_to_json_string, property_map_from_json};
pub use properties::{map_from_resource_data, map_from_resource_data_with_property_map, remove_properties};
