/*!
 * Manifest entry construction
 */

use std::path::{Path, PathBuf};

use stamp_core_manifest::{ExtraFields, ManifestRecord};

use crate::core::checksum::HashAlgorithm;
use crate::core::naming::{
    hashed_relative_path, normalize_lexically, relative_to_source, virtual_path,
    virtual_to_physical,
};
use crate::core::plugin::AssetPlugin;
use crate::error::{Result, StampError};

/// One asset's record while a run is in progress
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Root-relative logical path
    pub virtual_path: String,
    /// Source file location
    pub physical_path: PathBuf,
    /// Root-relative path with the hash in the file name
    pub hashed_virtual_path: String,
    /// Location the file is copied or written to
    pub hashed_physical_path: PathBuf,
    /// Content hash; absent on entries carried over from a previous manifest
    pub hash_code: Option<String>,
    /// Carried over from a previous run and not yet reconfirmed
    pub unverified: bool,
    /// Plugin-contributed fields
    pub extra: ExtraFields,
}

impl ManifestEntry {
    /// Rebuild an unverified entry from a previously persisted record
    ///
    /// Physical locations are reconstructed from the virtual paths.
    pub fn from_record(record: &ManifestRecord, source_base: &Path, target_base: &Path) -> Self {
        Self {
            virtual_path: record.virtual_path.clone(),
            physical_path: virtual_to_physical(source_base, &record.virtual_path),
            hashed_virtual_path: record.hashed_virtual_path.clone(),
            hashed_physical_path: virtual_to_physical(target_base, &record.hashed_virtual_path),
            hash_code: None,
            unverified: true,
            extra: record.extra.clone(),
        }
    }

    /// Strip run-local fields for persistence
    pub fn to_record(&self) -> ManifestRecord {
        ManifestRecord {
            virtual_path: self.virtual_path.clone(),
            hashed_virtual_path: self.hashed_virtual_path.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// Builds entry descriptors; performs no copying
pub struct EntryBuilder<'a> {
    source_base: &'a Path,
    target_base: &'a Path,
    algorithm: HashAlgorithm,
    plugins: &'a [Box<dyn AssetPlugin>],
}

impl<'a> EntryBuilder<'a> {
    pub fn new(
        source_base: &'a Path,
        target_base: &'a Path,
        algorithm: HashAlgorithm,
        plugins: &'a [Box<dyn AssetPlugin>],
    ) -> Self {
        Self {
            source_base,
            target_base,
            algorithm,
            plugins,
        }
    }

    /// Build an entry for `physical_path`, hashing `content`
    ///
    /// `content` is what will end up in the hashed file: the raw bytes for
    /// plain assets, the rewritten text for stylesheets.
    pub fn build(&self, physical_path: &Path, content: &[u8]) -> Result<ManifestEntry> {
        let hash = self.algorithm.fingerprint(content);
        self.build_with_hash(physical_path, content, hash)
    }

    /// Build an entry using a hash computed elsewhere
    pub fn build_with_hash(
        &self,
        physical_path: &Path,
        content: &[u8],
        hash: String,
    ) -> Result<ManifestEntry> {
        let physical_path = normalize_lexically(physical_path);
        let relative = relative_to_source(&physical_path, self.source_base)?;
        let hashed_relative = hashed_relative_path(&relative, &hash);

        let mut entry = ManifestEntry {
            virtual_path: virtual_path(&relative),
            hashed_virtual_path: virtual_path(&hashed_relative),
            hashed_physical_path: self.target_base.join(&hashed_relative),
            physical_path,
            hash_code: Some(hash),
            unverified: false,
            extra: ExtraFields::new(),
        };

        // Sequential, order-significant: a later plugin overwrites keys set
        // by an earlier one and sees the fields merged so far.
        for plugin in self.plugins {
            let fields = plugin
                .process_file(&entry, content)
                .map_err(|e| match e {
                    StampError::Plugin { .. } => e,
                    other => StampError::Plugin {
                        plugin: plugin.name().to_string(),
                        message: other.to_string(),
                    },
                })?;
            entry.extra.extend(fields);
        }

        Ok(entry)
    }
}
