//! Configuration hashing for change detection.
//!
//! This module provides deterministic hashing of resource configurations so
//! the planner can tell whether a resource was edited since the last apply.

use sha2::{Digest, Sha256};

use crate::helpers::format_json;
use crate::schema::{DiffSuppress, FieldValue};

use super::spec::{ProviderConfig, ResourceConfig};

/// Hasher for computing configuration hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire configuration.
    #[must_use]
    pub fn hash_config(&self, config: &ProviderConfig) -> String {
        let mut hasher = Sha256::new();

        if let Some(url) = &config.workspace.url {
            hasher.update(url.as_bytes());
        }
        for resource in &config.resources {
            hasher.update(self.hash_resource(resource).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single resource configuration.
    ///
    /// JSON document fields are hashed in canonical form, so reordering keys
    /// in `data` or `metadata` leaves the hash unchanged.
    #[must_use]
    pub fn hash_resource(&self, resource: &ResourceConfig) -> String {
        let mut hasher = Sha256::new();
        let schema = resource.kind.schema();

        hasher.update(resource.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(resource.kind.as_str().as_bytes());

        // BTreeMap iteration is already sorted
        for (name, value) in &resource.fields {
            hasher.update([0u8]);
            hasher.update(name.as_bytes());
            hasher.update([1u8]);

            let is_document = schema
                .field(name)
                .is_some_and(|f| f.diff_suppress == DiffSuppress::DataMatches);
            match value {
                FieldValue::String(s) if is_document => {
                    let canonical = format_json(name, s).unwrap_or_else(|_| s.clone());
                    hasher.update(canonical.as_bytes());
                }
                FieldValue::String(s) => hasher.update(s.as_bytes()),
                FieldValue::List(items) => {
                    for item in items {
                        hasher.update(item.as_bytes());
                        hasher.update([2u8]);
                    }
                }
                FieldValue::Map(entries) => {
                    for (key, value) in entries {
                        hasher.update(key.as_bytes());
                        hasher.update([3u8]);
                        hasher.update(value.as_bytes());
                        hasher.update([2u8]);
                    }
                }
            }
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes to determine if they are equal.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        // Constant-time comparison
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
