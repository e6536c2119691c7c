/*!
 * Removal of hashed output
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::config::StampConfig;
use crate::core::naming::{is_already_hashed, normalize_lexically, virtual_to_physical};
use crate::error::{Result, StampError};
use crate::manifest_integration::ManifestStore;
use crate::system::AssetSystem;

/// Result of a cleanup run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Hashed files deleted, in path order
    pub removed: Vec<PathBuf>,
    /// Hashed files left in place
    pub kept: usize,
    /// Whether the manifest itself was deleted
    pub manifest_removed: bool,
}

fn hashed_files(target_dir: &Path, system: &dyn AssetSystem) -> Result<Vec<PathBuf>> {
    if !system.is_dir(target_dir) {
        return Ok(Vec::new());
    }
    let files = system
        .list_files(target_dir)
        .map_err(|e| StampError::io(target_dir, e))?;
    Ok(files
        .into_iter()
        .filter(|file| is_already_hashed(file))
        .collect())
}

fn remove(path: &Path, system: &dyn AssetSystem) -> Result<()> {
    system
        .remove_file(path)
        .map_err(|e| StampError::io(path, e))?;
    debug!(path = %path.display(), "Removed hashed file");
    Ok(())
}

/// Delete the manifest and every hashed file below `target_dir`
///
/// Files without a hash marker are never touched.
pub fn clean(
    target_dir: &Path,
    config: &StampConfig,
    system: &dyn AssetSystem,
) -> Result<CleanStats> {
    let store = ManifestStore::for_target(target_dir, config, system);
    let mut stats = CleanStats {
        manifest_removed: store.remove()?,
        ..Default::default()
    };

    for file in hashed_files(target_dir, system)? {
        remove(&file, system)?;
        stats.removed.push(file);
    }

    info!(
        target = %target_dir.display(),
        removed = stats.removed.len(),
        manifest_removed = stats.manifest_removed,
        "Clean complete"
    );
    Ok(stats)
}

/// Delete hashed files the current manifest no longer references
///
/// With `clean_old_days` set, an unreferenced file is only deleted once its
/// modification time is older than `now` minus that many days.
pub fn clean_old(
    target_dir: &Path,
    config: &StampConfig,
    system: &dyn AssetSystem,
    now: DateTime<Utc>,
) -> Result<CleanStats> {
    let store = ManifestStore::for_target(target_dir, config, system);
    let referenced: HashSet<PathBuf> = store
        .load()?
        .unwrap_or_default()
        .iter()
        .map(|record| virtual_to_physical(target_dir, &record.hashed_virtual_path))
        .collect();

    let cutoff = config.clean_old_days.map(|days| {
        i64::try_from(days)
            .ok()
            .and_then(TimeDelta::try_days)
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    });

    let mut stats = CleanStats::default();
    for file in hashed_files(target_dir, system)? {
        if referenced.contains(&normalize_lexically(&file)) {
            stats.kept += 1;
            continue;
        }

        if let Some(cutoff) = cutoff {
            let modified: DateTime<Utc> = system
                .modified(&file)
                .map_err(|e| StampError::io(&file, e))?
                .into();
            if modified >= cutoff {
                debug!(path = %file.display(), %modified, "Keeping recent unreferenced file");
                stats.kept += 1;
                continue;
            }
        }

        remove(&file, system)?;
        stats.removed.push(file);
    }

    info!(
        target = %target_dir.display(),
        removed = stats.removed.len(),
        kept = stats.kept,
        "Clean-old complete"
    );
    Ok(stats)
}
