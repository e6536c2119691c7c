//! Persisted manifest records
//!
//! A record is the consumer-facing half of an asset entry: the logical path a
//! web server or template looks up, the fingerprinted path it should serve,
//! and whatever fields plugins attached. Run-local details (physical paths,
//! hash codes) never reach this type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Plugin-contributed fields, kept in key order for stable output
pub type ExtraFields = BTreeMap<String, Value>;

/// One asset in a serialized manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    /// Root-relative logical path, e.g. `/css/site.css`
    pub virtual_path: String,

    /// Root-relative path with the content hash embedded in the filename
    pub hashed_virtual_path: String,

    /// Opaque plugin fields, flattened into the record
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ManifestRecord {
    /// Create a record without plugin fields
    pub fn new(virtual_path: impl Into<String>, hashed_virtual_path: impl Into<String>) -> Self {
        Self {
            virtual_path: virtual_path.into(),
            hashed_virtual_path: hashed_virtual_path.into(),
            extra: ExtraFields::new(),
        }
    }

    /// Attach a plugin field (builder style)
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Sort records by virtual path using plain byte-wise string ordering
pub fn sort_records(records: &mut [ManifestRecord]) {
    records.sort_by(|a, b| a.virtual_path.cmp(&b.virtual_path));
}
