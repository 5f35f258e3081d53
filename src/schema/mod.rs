//! Resource field model.
//!
//! This module provides the generic field accessor handed to every handler,
//! the static schema of each resource kind and the diff-suppression rules
//! the planner applies when comparing configuration with state.

mod data;
mod definition;
mod suppress;

pub use data::{FieldValue, ResourceData};
pub use definition::{
    DiffSuppress, FieldMode, FieldSchema, FieldType, ResourceSchema, FILE_SCHEMA, GRANT_SCHEMA,
    SMART_FOLDER_ATTACHMENT_SCHEMA,
};
pub use suppress::{suppress_if_aka_matches, suppress_if_data_matches};
