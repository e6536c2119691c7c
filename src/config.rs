/*!
 * Configuration types for Stamp
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StampError};
use stamp_core_manifest::ManifestFormat;

/// Main configuration for fingerprinting and cleanup runs
///
/// One value is built per invocation and passed explicitly to every entry
/// point; nothing here is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampConfig {
    /// Include patterns (glob, regex, or path); an include overrides an exclude
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Exclude patterns (glob, regex, or path)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Manifest codec
    #[serde(default)]
    pub manifest_format: ManifestFormat,

    /// Explicit manifest location (default: `<target>/manifest.<ext>`)
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Reuse and re-verify entries from the existing manifest
    #[serde(default)]
    pub amend: bool,

    /// Error handling mode
    #[serde(default)]
    pub error_mode: ErrorMode,

    /// Use the fast non-cryptographic content hash
    #[serde(default)]
    pub quick_hash: bool,

    /// Rewrite asset references inside stylesheets
    #[serde(default = "default_true")]
    pub process_css: bool,

    /// Plugins to run for every entry, in order
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Age threshold for `clean-old`; unset deletes every unreferenced hashed file
    #[serde(default)]
    pub clean_old_days: Option<u64>,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            manifest_format: ManifestFormat::Json,
            manifest_path: None,
            amend: false,
            error_mode: ErrorMode::Abort,
            quick_hash: false,
            process_css: default_true(),
            plugins: Vec::new(),
            clean_old_days: None,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Error handling mode determines behavior on per-file errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Abort on first error, write no manifest
    #[default]
    Abort,

    /// Record the error, leave the file out of the manifest, keep going
    Continue,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

impl StampConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StampError::io(path, e))?;
        toml::from_str(&contents).map_err(|e| {
            StampError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StampError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents).map_err(|e| StampError::io(path, e))
    }

    /// Whether per-file errors are recorded instead of aborting the run
    pub fn continue_on_error(&self) -> bool {
        self.error_mode == ErrorMode::Continue
    }

    /// Resolve where the manifest lives for a given target directory
    pub fn manifest_path_for(&self, target_dir: &Path) -> PathBuf {
        self.manifest_path
            .clone()
            .unwrap_or_else(|| target_dir.join(self.manifest_format.default_file_name()))
    }
}
