//! Composite identity codec for attachment relations.
//!
//! An attachment has no remote identifier of its own; its identity is the
//! pair `(smart_folder, resource)` encoded as `"<smart_folder>_<resource>"`.
//!
//! Decoding splits on the first underscore, so the encoding is only
//! unambiguous while the smart-folder part never contains `_`. Turbot ids are
//! numeric, which keeps plain ids safe; an aka on the left side would not be.

use crate::error::{ResourceError, Result};

/// Separator between the two parts of a composite id.
pub const ID_SEPARATOR: char = '_';

/// Encodes a two-part relation key.
#[must_use]
pub fn build_id(first: &str, second: &str) -> String {
    format!("{first}{ID_SEPARATOR}{second}")
}

/// Decodes a composite key produced by [`build_id`].
///
/// # Errors
///
/// Returns [`ResourceError::InvalidId`] when there is no separator or either
/// part is empty.
pub fn parse_id(id: &str) -> Result<(String, String)> {
    match id.split_once(ID_SEPARATOR) {
        Some((first, second)) if !first.is_empty() && !second.is_empty() => {
            Ok((first.to_string(), second.to_string()))
        }
        _ => Err(ResourceError::InvalidId { id: id.to_string() }.into()),
    }
}
