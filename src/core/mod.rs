/*!
 * Core fingerprinting operations
 */

pub mod checksum;
pub mod cleanup;
pub mod entry;
pub mod filter;
pub mod naming;
pub mod plugin;
pub mod reconcile;
pub mod rewrite;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::StampConfig;
use crate::error::{Result, StampError};
use crate::manifest_integration::ManifestStore;
use crate::system::AssetSystem;

use reconcile::{reconcile, ReconcileOptions, ReconcileReport};

/// Result of fingerprinting a source directory
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Where the manifest was written
    pub manifest_path: PathBuf,
    pub report: ReconcileReport,
}

impl RunOutcome {
    /// 0 on success, nonzero when per-file errors were recorded
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

/// Fingerprint every file under `source_dir` into `target_dir` and write the
/// manifest
///
/// The previous manifest is removed before any file is processed, so a run
/// that aborts leaves no manifest behind.
pub fn process_directory(
    source_dir: &Path,
    target_dir: &Path,
    config: &StampConfig,
    system: &dyn AssetSystem,
) -> Result<RunOutcome> {
    if !system.is_dir(source_dir) {
        return Err(StampError::SourceNotFound(source_dir.to_path_buf()));
    }

    let store = ManifestStore::for_target(target_dir, config, system);
    let options =
        ReconcileOptions::from_config(config)?.with_manifest_path(store.path().to_path_buf());

    info!(
        source = %source_dir.display(),
        target = %target_dir.display(),
        manifest = %store.path().display(),
        algorithm = %options.algorithm,
        amend = config.amend,
        filtered = !options.filter.is_empty(),
        "Fingerprinting assets"
    );

    let previous = if config.amend { store.load()? } else { None };
    store.remove()?;

    let files = system
        .list_files(source_dir)
        .map_err(|e| StampError::io(source_dir, e))?;

    let report = reconcile(
        &files,
        source_dir,
        target_dir,
        previous.as_deref(),
        &options,
        system,
    )?;

    store.save(&report.records)?;

    if !report.is_success() {
        warn!(
            errors = report.errors.len(),
            "Manifest written with per-file errors"
        );
    }

    Ok(RunOutcome {
        manifest_path: store.path().to_path_buf(),
        report,
    })
}
