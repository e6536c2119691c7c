/*!
 * Hash-named path resolution
 *
 * A fingerprinted file keeps its stem and extension and gains a `~<hash>`
 * marker in between: `app.min.js` becomes `app.min~0123456789abcdef.js`.
 * The marker is recognizable from the file name alone, so output that is
 * rediscovered as input can be skipped without reading it.
 */

use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use crate::core::checksum::HASH_LEN;
use crate::error::{Result, StampError};

/// Separator between the original stem and the embedded hash
pub const HASH_MARKER: char = '~';

fn hashed_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"^.+~[0-9a-f]{{{}}}(\.[^.]+)?$", HASH_LEN))
            .expect("hashed name pattern is valid")
    })
}

/// Embed `hash` into a file name between stem and extension
pub fn hashed_file_name(file_name: &str, hash: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!(
            "{}{}{}{}",
            &file_name[..dot],
            HASH_MARKER,
            hash,
            &file_name[dot..]
        ),
        _ => format!("{}{}{}", file_name, HASH_MARKER, hash),
    }
}

/// Whether a path's file name already carries a hash marker
pub fn is_already_hashed(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| hashed_name_pattern().is_match(name))
        .unwrap_or(false)
}

/// Resolve `.` and `..` components without touching the file system
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Path of `physical_path` relative to `source_base`
///
/// Fails with `OutsideSource` when the file does not lie under the base.
pub fn relative_to_source(physical_path: &Path, source_base: &Path) -> Result<PathBuf> {
    physical_path
        .strip_prefix(source_base)
        .ok()
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| StampError::OutsideSource {
            path: physical_path.to_path_buf(),
            source_base: source_base.to_path_buf(),
        })
}

/// Rooted, forward-slash form of a source-relative path (`/css/site.css`)
pub fn virtual_path(relative: &Path) -> String {
    let mut virtual_path = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            virtual_path.push('/');
            virtual_path.push_str(&part.to_string_lossy());
        }
    }
    if virtual_path.is_empty() {
        virtual_path.push('/');
    }
    virtual_path
}

/// Physical location of a rooted virtual path beneath `base`
pub fn virtual_to_physical(base: &Path, virtual_path: &str) -> PathBuf {
    let mut physical = base.to_path_buf();
    for part in virtual_path.split('/').filter(|part| !part.is_empty()) {
        physical.push(part);
    }
    normalize_lexically(&physical)
}

/// Relative path with the hash embedded in the file name
pub fn hashed_relative_path(relative: &Path, hash: &str) -> PathBuf {
    let file_name = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    relative.with_file_name(hashed_file_name(&file_name, hash))
}

/// Hashed physical location of a source file inside the target tree
///
/// The subdirectory structure beneath `source_base` is preserved.
pub fn compute_hashed_path(
    physical_path: &Path,
    source_base: &Path,
    target_base: &Path,
    hash: &str,
) -> Result<PathBuf> {
    let relative = relative_to_source(physical_path, source_base)?;
    Ok(target_base.join(hashed_relative_path(&relative, hash)))
}

/// Directory part of a rooted virtual path (`/css/site.css` -> `/css`)
pub fn virtual_dir(virtual_path: &str) -> &str {
    match virtual_path.rfind('/') {
        Some(0) | None => "/",
        Some(slash) => &virtual_path[..slash],
    }
}

/// URL that reaches `to_virtual` from the virtual directory `from_dir`
///
/// Both arguments are rooted virtual paths; the result never starts with `/`.
pub fn relative_url(from_dir: &str, to_virtual: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to_virtual.split('/').filter(|s| !s.is_empty()).collect();
    let to_dirs = &to[..to.len().saturating_sub(1)];

    let common = from
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::with_capacity(from.len() - common + to.len() - common);
    parts.extend(std::iter::repeat("..").take(from.len() - common));
    parts.extend(&to[common..]);
    parts.join("/")
}
