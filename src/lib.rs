/*!
 * Stamp - content-hashed static assets
 *
 * Copies every file of a source tree into a target tree under a name that
 * embeds a digest of its content, and writes a manifest mapping each
 * logical path to its hashed path:
 * - SHA-256 (default) or XXH3 fingerprints
 * - Stylesheet `url(...)` and `@import` references rewritten to hashed names
 * - Amend mode that only copies what changed since the last manifest
 * - JSON or TOML manifests, with plugin-contributed fields
 * - Cleanup of stale hashed output
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod manifest_integration;
pub mod system;

// Re-export commonly used types
pub use config::{ErrorMode, LogLevel, StampConfig};
pub use core::cleanup::{clean, clean_old, CleanStats};
pub use core::reconcile::{reconcile, ReconcileOptions, ReconcileReport, ReconcileStats};
pub use core::{process_directory, RunOutcome};
pub use error::{Result, StampError};
pub use stamp_core_manifest::{ManifestFormat, ManifestRecord};
pub use system::{AssetSystem, LocalSystem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
