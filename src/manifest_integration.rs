//! Manifest file integration for Stamp runs
//!
//! Bridges the record codecs in `stamp-core-manifest` and the file system:
//! locating the manifest for a target directory, loading it for amend and
//! cleanup runs, and writing the final record list.

use std::path::{Path, PathBuf};

use stamp_core_manifest::{validate_records, ManifestFormat, ManifestRecord};
use tracing::debug;

use crate::config::StampConfig;
use crate::error::{Result, StampError};
use crate::system::AssetSystem;

/// The manifest file belonging to one target directory
pub struct ManifestStore<'a> {
    path: PathBuf,
    format: ManifestFormat,
    system: &'a dyn AssetSystem,
}

impl<'a> ManifestStore<'a> {
    /// Manifest for `target_dir` as configured (`manifest_path` or
    /// `<target>/manifest.<ext>`)
    pub fn for_target(
        target_dir: &Path,
        config: &StampConfig,
        system: &'a dyn AssetSystem,
    ) -> Self {
        Self {
            path: config.manifest_path_for(target_dir),
            format: config.manifest_format,
            system,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.system.is_file(&self.path)
    }

    /// Parse and validate the manifest; `None` when there is none yet
    pub fn load(&self) -> Result<Option<Vec<ManifestRecord>>> {
        if !self.exists() {
            return Ok(None);
        }

        let bytes = self
            .system
            .read(&self.path)
            .map_err(|e| StampError::io(&self.path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| StampError::InvalidContent {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let records = self.format.codec().parse(&text)?;
        validate_records(&records)?;

        debug!(
            path = %self.path.display(),
            format = %self.format,
            records = records.len(),
            "Loaded manifest"
        );
        Ok(Some(records))
    }

    /// Serialize `records` and write them to the manifest path
    pub fn save(&self, records: &[ManifestRecord]) -> Result<()> {
        let text = self.format.codec().serialize(records)?;
        self.system
            .write(&self.path, text.as_bytes())
            .map_err(|e| StampError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            format = %self.format,
            records = records.len(),
            "Wrote manifest"
        );
        Ok(())
    }

    /// Delete the manifest if present; reports whether a file was removed
    pub fn remove(&self) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        self.system
            .remove_file(&self.path)
            .map_err(|e| StampError::io(&self.path, e))?;
        Ok(true)
    }
}
