/*!
 * Error types for Stamp
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::core::filter::FilterError;

pub type Result<T> = std::result::Result<T, StampError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum StampError {
    /// Source directory does not exist
    SourceNotFound(PathBuf),

    /// Candidate file does not lie under the declared source base
    OutsideSource { path: PathBuf, source_base: PathBuf },

    /// I/O error tied to a specific file
    Io { path: PathBuf, source: io::Error },

    /// Stylesheet content could not be read as text
    InvalidContent { path: PathBuf, message: String },

    /// A stylesheet reference leads back to a file still being processed
    ReferenceCycle { path: PathBuf, via: PathBuf },

    /// A plugin failed while contributing fields
    Plugin { plugin: String, message: String },

    /// Manifest could not be encoded, decoded or validated
    Manifest(stamp_core_manifest::Error),

    /// Configuration error
    Config(String),
}

impl StampError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StampError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            StampError::Io { .. }
            | StampError::InvalidContent { .. }
            | StampError::ReferenceCycle { .. }
            | StampError::Plugin { .. } => EXIT_PARTIAL,
            _ => EXIT_FATAL,
        }
    }

    /// Check if this error must abort the run even when continuing on errors
    ///
    /// Fatal errors point at a caller or configuration bug rather than at the
    /// content of one file.
    pub fn is_fatal(&self) -> bool {
        match self {
            StampError::SourceNotFound(_) => true,
            StampError::OutsideSource { .. } => true,
            StampError::Config(_) => true,
            StampError::Manifest(_) => true,

            StampError::Io { .. } => false,
            StampError::InvalidContent { .. } => false,
            StampError::ReferenceCycle { .. } => false,
            StampError::Plugin { .. } => false,
        }
    }
}

impl fmt::Display for StampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StampError::SourceNotFound(path) => {
                write!(f, "Source directory not found: {}", path.display())
            }
            StampError::OutsideSource { path, source_base } => {
                write!(
                    f,
                    "File {} is not located under source directory {}",
                    path.display(),
                    source_base.display()
                )
            }
            StampError::Io { path, source } => {
                write!(f, "I/O error at {}: {}", path.display(), source)
            }
            StampError::InvalidContent { path, message } => {
                write!(f, "Invalid content in {}: {}", path.display(), message)
            }
            StampError::ReferenceCycle { path, via } => {
                write!(
                    f,
                    "Reference cycle: {} references {} which is still being processed",
                    via.display(),
                    path.display()
                )
            }
            StampError::Plugin { plugin, message } => {
                write!(f, "Plugin '{}' failed: {}", plugin, message)
            }
            StampError::Manifest(err) => {
                write!(f, "Manifest error: {}", err)
            }
            StampError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StampError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StampError::Io { source, .. } => Some(source),
            StampError::Manifest(err) => Some(err),
            _ => None,
        }
    }
}

impl From<stamp_core_manifest::Error> for StampError {
    fn from(err: stamp_core_manifest::Error) -> Self {
        StampError::Manifest(err)
    }
}

impl From<FilterError> for StampError {
    fn from(err: FilterError) -> Self {
        StampError::Config(err.to_string())
    }
}
