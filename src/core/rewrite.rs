/*!
 * Stylesheet reference rewriting
 *
 * Finds `url(...)` tokens and `@import "..."` strings in stylesheet text,
 * hands each local reference to a resolver, and substitutes the hashed
 * path the resolver reports. References the resolver declines are left
 * byte-for-byte unchanged.
 */

use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::entry::ManifestEntry;
use crate::core::naming::{normalize_lexically, relative_url};
use crate::error::Result;

/// Whether a file carries references that should be rewritten
pub fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("css"))
        .unwrap_or(false)
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^"'()\s][^()\s]*))\s*\)|@import\s+(?:"([^"]*)"|'([^']*)')"#,
        )
        .expect("reference pattern is valid")
    })
}

fn scheme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("scheme pattern is valid")
    })
}

/// A reference found in stylesheet text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssReference<'t> {
    /// Byte range of the reference inside the text, quotes excluded
    pub range: Range<usize>,
    /// The reference as written
    pub url: &'t str,
}

/// Every `url(...)` and `@import` string reference, in text order
pub fn find_references(text: &str) -> Vec<CssReference<'_>> {
    reference_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            (1..=5)
                .filter_map(|group| caps.get(group))
                .next()
                .map(|m| CssReference {
                    range: m.range(),
                    url: m.as_str(),
                })
        })
        .collect()
}

/// Whether a reference points at a local file that may be fingerprinted
pub fn is_local_reference(url: &str) -> bool {
    let url = url.trim();
    !(url.is_empty()
        || url.starts_with('#')
        || url.starts_with("//")
        || scheme_pattern().is_match(url))
}

/// Split `img.png?v=1#x` into `("img.png", "?v=1#x")`
fn split_suffix(url: &str) -> (&str, &str) {
    match url.find(['?', '#']) {
        Some(index) => url.split_at(index),
        None => (url, ""),
    }
}

/// Physical path a local reference points at
///
/// Root-relative references resolve against `source_base`, everything else
/// against the directory containing the stylesheet.
pub fn resolve_reference(url_path: &str, stylesheet: &Path, source_base: &Path) -> PathBuf {
    let base = if url_path.starts_with('/') {
        source_base.to_path_buf()
    } else {
        stylesheet
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| source_base.to_path_buf())
    };

    let mut resolved = base;
    for part in url_path.split('/').filter(|part| !part.is_empty()) {
        resolved.push(part);
    }
    normalize_lexically(&resolved)
}

/// Result of rewriting one stylesheet
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenStylesheet {
    /// Stylesheet text with references replaced by hashed paths
    pub text: String,
    /// Virtual paths of the assets that were substituted, in text order
    pub references: Vec<String>,
}

/// Rewrite references in `text`
///
/// `stylesheet_dir` is the stylesheet's virtual directory (`/css`); relative
/// references are rewritten relative to it. `resolve` is called with the
/// physical path of every local reference inside `source_base` and returns
/// the entry to substitute, or `None` to leave the reference alone.
pub fn rewrite_references<F>(
    text: &str,
    stylesheet: &Path,
    stylesheet_dir: &str,
    source_base: &Path,
    mut resolve: F,
) -> Result<RewrittenStylesheet>
where
    F: FnMut(&Path) -> Result<Option<ManifestEntry>>,
{
    let mut output = String::with_capacity(text.len());
    let mut references = Vec::new();
    let mut cursor = 0;

    for reference in find_references(text) {
        if !is_local_reference(reference.url) {
            continue;
        }

        let url = reference.url.trim();
        let (url_path, suffix) = split_suffix(url);
        if url_path.is_empty() {
            continue;
        }

        let resolved = resolve_reference(url_path, stylesheet, source_base);
        if !resolved.starts_with(source_base) {
            tracing::debug!(
                stylesheet = %stylesheet.display(),
                reference = url,
                "Reference points outside the source directory, leaving it unchanged"
            );
            continue;
        }

        let Some(entry) = resolve(&resolved)? else {
            continue;
        };

        let replacement = if url_path.starts_with('/') {
            entry.hashed_virtual_path.clone()
        } else {
            relative_url(stylesheet_dir, &entry.hashed_virtual_path)
        };

        output.push_str(&text[cursor..reference.range.start]);
        output.push_str(&replacement);
        output.push_str(suffix);
        cursor = reference.range.end;
        references.push(entry.virtual_path);
    }

    output.push_str(&text[cursor..]);
    Ok(RewrittenStylesheet {
        text: output,
        references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stamp_core_manifest::ExtraFields;

    fn entry_for(virtual_path: &str, hashed: &str) -> ManifestEntry {
        ManifestEntry {
            virtual_path: virtual_path.to_string(),
            physical_path: PathBuf::from(format!("/src{}", virtual_path)),
            hashed_virtual_path: hashed.to_string(),
            hashed_physical_path: PathBuf::from(format!("/dist{}", hashed)),
            hash_code: None,
            unverified: false,
            extra: ExtraFields::new(),
        }
    }

    fn hashing_resolver(resolved: &Path) -> Result<Option<ManifestEntry>> {
        let relative = resolved.strip_prefix("/src").unwrap();
        let virtual_path = format!("/{}", relative.display());
        let hashed = virtual_path.replacen('.', "~0123456789abcdef.", 1);
        Ok(Some(entry_for(&virtual_path, &hashed)))
    }

    #[test]
    fn test_is_stylesheet() {
        assert!(is_stylesheet(Path::new("/src/site.css")));
        assert!(is_stylesheet(Path::new("/src/SITE.CSS")));
        assert!(!is_stylesheet(Path::new("/src/site.scss")));
        assert!(!is_stylesheet(Path::new("/src/css")));
    }

    #[test]
    fn test_find_references_all_forms() {
        let text = r#"a{background:url(img.png)} b{background:url( "q.png" )} c{x:url('s.png')} @import "base.css"; @import 'more.css';"#;
        let urls: Vec<&str> = find_references(text).iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["img.png", "q.png", "s.png", "base.css", "more.css"]);
    }

    #[test]
    fn test_import_url_form() {
        let urls: Vec<String> = find_references("@import url(reset.css);")
            .iter()
            .map(|r| r.url.to_string())
            .collect();
        assert_eq!(urls, vec!["reset.css"]);
    }

    #[test]
    fn test_non_local_references() {
        assert!(!is_local_reference("data:image/png;base64,AAAA"));
        assert!(!is_local_reference("https://cdn.example.com/a.png"));
        assert!(!is_local_reference("//cdn.example.com/a.png"));
        assert!(!is_local_reference("#filter"));
        assert!(!is_local_reference(""));
        assert!(is_local_reference("../img/a.png"));
        assert!(is_local_reference("/img/a.png"));
    }

    #[test]
    fn test_resolve_reference() {
        let stylesheet = Path::new("/src/css/site.css");
        assert_eq!(
            resolve_reference("../img/a.png", stylesheet, Path::new("/src")),
            PathBuf::from("/src/img/a.png")
        );
        assert_eq!(
            resolve_reference("/img/a.png", stylesheet, Path::new("/src")),
            PathBuf::from("/src/img/a.png")
        );
        assert_eq!(
            resolve_reference("./bg.png", stylesheet, Path::new("/src")),
            PathBuf::from("/src/css/bg.png")
        );
    }

    #[test]
    fn test_relative_reference_rewritten_relative() {
        let rewritten = rewrite_references(
            "body { background: url(../img/a.png); }",
            Path::new("/src/css/site.css"),
            "/css",
            Path::new("/src"),
            hashing_resolver,
        )
        .unwrap();

        assert_eq!(
            rewritten.text,
            "body { background: url(../img/a~0123456789abcdef.png); }"
        );
        assert_eq!(rewritten.references, vec!["/img/a.png".to_string()]);
    }

    #[test]
    fn test_root_relative_reference_rewritten_rooted() {
        let rewritten = rewrite_references(
            "body { background: url('/img/a.png?v=2#top'); }",
            Path::new("/src/css/site.css"),
            "/css",
            Path::new("/src"),
            hashing_resolver,
        )
        .unwrap();

        assert_eq!(
            rewritten.text,
            "body { background: url('/img/a~0123456789abcdef.png?v=2#top'); }"
        );
    }

    #[test]
    fn test_declined_and_foreign_references_untouched() {
        let text = "a{x:url(missing.png)} b{x:url(http://x.org/a.png)} c{x:url(../../../etc/a.png)}";
        let mut asked = Vec::new();
        let rewritten = rewrite_references(
            text,
            Path::new("/src/css/site.css"),
            "/css",
            Path::new("/src"),
            |resolved| {
                asked.push(resolved.to_path_buf());
                Ok(None)
            },
        )
        .unwrap();

        assert_eq!(rewritten.text, text);
        assert!(rewritten.references.is_empty());
        // Only the in-tree local reference reaches the resolver
        assert_eq!(asked, vec![PathBuf::from("/src/css/missing.png")]);
    }

    #[test]
    fn test_resolver_error_propagates() {
        let result = rewrite_references(
            "a{x:url(a.png)}",
            Path::new("/src/site.css"),
            "/",
            Path::new("/src"),
            |resolved| Err(crate::error::StampError::io(resolved, std::io::Error::other("boom"))),
        );
        assert!(result.is_err());
    }
}
