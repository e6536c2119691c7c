//! File-system primitives used by the reconciliation engine
//!
//! The engine never touches `std::fs` directly; it goes through the
//! `AssetSystem` trait so tests can swap in an in-memory implementation:
//! - `LocalSystem`: Direct filesystem access
//! - `MockSystem`: In-memory implementation with failure injection (tests only)

mod local;

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use local::LocalSystem;

#[cfg(test)]
pub mod mock;

#[cfg(test)]
pub use mock::MockSystem;

/// Synchronous file-system operations treated as atomic primitives
pub trait AssetSystem {
    /// Whether `path` names an existing regular file
    fn is_file(&self, path: &Path) -> bool;

    /// Whether `path` names an existing directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Read a whole file
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a whole file, creating parent directories as needed
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Copy a file, creating parent directories of `to` as needed
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Last-modified time of a file
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Delete a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Every regular file below `dir`, recursively, sorted by path
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}
