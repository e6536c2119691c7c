//! Local filesystem implementation of AssetSystem

use super::AssetSystem;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Local filesystem implementation of AssetSystem
///
/// Wraps `std::fs` for single files and `walkdir` for enumeration.
///
/// # Example
///
/// ```rust,no_run
/// use stamp::system::{AssetSystem, LocalSystem};
/// use std::path::Path;
///
/// let system = LocalSystem::new();
/// let files = system.list_files(Path::new("public")).unwrap();
/// println!("{} candidate assets", files.len());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LocalSystem;

impl LocalSystem {
    /// Create a new LocalSystem instance
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl AssetSystem for LocalSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        ensure_parent(path)?;
        fs::write(path, data)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        ensure_parent(to)?;
        fs::copy(from, to).map(|_| ())
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}
