//! In-memory filesystem implementation for testing
//!
//! Stores files in a map so unit tests can run the engine without touching
//! disk, and can inject write failures for specific destinations.

use super::AssetSystem;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// In-memory file data
#[derive(Debug, Clone)]
struct MockFile {
    data: Vec<u8>,
    modified: SystemTime,
}

/// Mock filesystem implementation for testing
#[derive(Debug, Clone, Default)]
pub struct MockSystem {
    files: Arc<RwLock<BTreeMap<PathBuf, MockFile>>>,
    failing_writes: Arc<RwLock<HashSet<PathBuf>>>,
    write_count: Arc<RwLock<usize>>,
}

impl MockSystem {
    /// Create a new empty mock filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the given content
    pub fn add_file(&self, path: impl Into<PathBuf>, data: &[u8]) {
        self.add_file_modified(path, data, SystemTime::now());
    }

    /// Add a file with an explicit modification time
    pub fn add_file_modified(&self, path: impl Into<PathBuf>, data: &[u8], modified: SystemTime) {
        self.files.write().unwrap().insert(
            path.into(),
            MockFile {
                data: data.to_vec(),
                modified,
            },
        );
    }

    /// Make every write or copy to `path` fail with a permission error
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        self.failing_writes.write().unwrap().insert(path.into());
    }

    /// Get file data (for testing)
    pub fn get_data(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().unwrap().get(path).map(|f| f.data.clone())
    }

    /// Number of successful writes and copies so far
    pub fn write_count(&self) -> usize {
        *self.write_count.read().unwrap()
    }

    fn store(&self, path: &Path, data: Vec<u8>) -> io::Result<()> {
        if self.failing_writes.read().unwrap().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected write failure",
            ));
        }
        self.files.write().unwrap().insert(
            path.to_path_buf(),
            MockFile {
                data,
                modified: SystemTime::now(),
            },
        );
        *self.write_count.write().unwrap() += 1;
        Ok(())
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}

impl AssetSystem for MockSystem {
    fn is_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.get_data(path).ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.store(path, data.to_vec())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let data = self.read(from)?;
        self.store(to, data)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| not_found(path))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.files
            .write()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(dir) {
            return Err(not_found(dir));
        }
        Ok(self
            .files
            .read()
            .unwrap()
            .keys()
            .filter(|file| file.starts_with(dir))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_read() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"hello");

        assert!(system.is_file(Path::new("/src/a.txt")));
        assert!(system.is_dir(Path::new("/src")));
        assert_eq!(system.read(Path::new("/src/a.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_injected_failure() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"hello");
        system.fail_writes_to("/dist/a.txt");

        let err = system
            .copy(Path::new("/src/a.txt"), Path::new("/dist/a.txt"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(system.write_count(), 0);
    }

    #[test]
    fn test_list_files_sorted() {
        let system = MockSystem::new();
        system.add_file("/src/b.txt", b"b");
        system.add_file("/src/a/c.txt", b"c");
        system.add_file("/other/d.txt", b"d");

        let files = system.list_files(Path::new("/src")).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("/src/a/c.txt"), PathBuf::from("/src/b.txt")]
        );
    }
}
