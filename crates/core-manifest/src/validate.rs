//! Structural validation for parsed manifests
//!
//! A manifest read back from disk drives amend mode, so a malformed one must
//! be rejected before any entry is trusted.

use crate::error::{Error, Result};
use crate::record::ManifestRecord;
use std::collections::HashSet;

/// Validate a list of records read from a manifest file
///
/// Every path must be rooted (start with `/`), non-empty beyond the root and
/// free of `.`/`..` segments, and no virtual path may appear twice.
pub fn validate_records(records: &[ManifestRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut problems = Vec::new();

    for (index, record) in records.iter().enumerate() {
        check_rooted(index, "virtualPath", &record.virtual_path, &mut problems);
        check_rooted(
            index,
            "hashedVirtualPath",
            &record.hashed_virtual_path,
            &mut problems,
        );

        if !seen.insert(record.virtual_path.as_str()) {
            problems.push(format!(
                "[{}] duplicate virtualPath '{}'",
                index, record.virtual_path
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "manifest validation failed:\n  - {}",
            problems.join("\n  - ")
        )))
    }
}

fn check_rooted(index: usize, field: &str, value: &str, problems: &mut Vec<String>) {
    if !value.starts_with('/') || value.len() < 2 {
        problems.push(format!(
            "[{}] {} '{}' must be a rooted path",
            index, field, value
        ));
    } else if value.contains('\\') {
        problems.push(format!(
            "[{}] {} '{}' must use forward slashes",
            index, field, value
        ));
    } else if value.split('/').any(|segment| segment == ".." || segment == ".") {
        problems.push(format!(
            "[{}] {} '{}' must not contain '.' or '..' segments",
            index, field, value
        ));
    }
}
