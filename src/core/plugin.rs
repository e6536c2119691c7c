/*!
 * Entry plugins
 *
 * A plugin looks at a freshly built entry plus the bytes that will be
 * written for it and returns extra fields to merge into the manifest record.
 * Plugins run in declaration order; when two plugins set the same key, the
 * later one wins.
 */

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use sha2::{Digest, Sha384};

use stamp_core_manifest::ExtraFields;

use crate::core::entry::ManifestEntry;
use crate::error::{Result, StampError};

/// Fields a plugin contributes to one entry
pub type PluginFields = ExtraFields;

/// Capability that attaches extra fields to manifest entries
pub trait AssetPlugin {
    /// Name used in configuration and error messages
    fn name(&self) -> &str;

    /// Compute extra fields for `entry`
    fn process_file(&self, entry: &ManifestEntry, content: &[u8]) -> Result<PluginFields>;
}

/// Adds a Subresource Integrity string (`integrity: "sha384-..."`)
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityPlugin;

impl AssetPlugin for IntegrityPlugin {
    fn name(&self) -> &str {
        "integrity"
    }

    fn process_file(&self, _entry: &ManifestEntry, content: &[u8]) -> Result<PluginFields> {
        let digest = Sha384::digest(content);
        let mut fields = PluginFields::new();
        fields.insert(
            "integrity".to_string(),
            json!(format!("sha384-{}", STANDARD.encode(digest))),
        );
        Ok(fields)
    }
}

/// Adds the byte length of the written file (`size`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SizePlugin;

impl AssetPlugin for SizePlugin {
    fn name(&self) -> &str {
        "size"
    }

    fn process_file(&self, _entry: &ManifestEntry, content: &[u8]) -> Result<PluginFields> {
        let mut fields = PluginFields::new();
        fields.insert("size".to_string(), json!(content.len()));
        Ok(fields)
    }
}

/// Instantiate built-in plugins by name, keeping the given order
pub fn plugins_from_names(names: &[String]) -> Result<Vec<Box<dyn AssetPlugin>>> {
    names
        .iter()
        .map(|name| -> Result<Box<dyn AssetPlugin>> {
            match name.trim() {
                "integrity" => Ok(Box::new(IntegrityPlugin)),
                "size" => Ok(Box::new(SizePlugin)),
                other => Err(StampError::Config(format!("Unknown plugin: {}", other))),
            }
        })
        .collect()
}
