/*!
 * Reconciliation of a file list against the target tree
 *
 * One `Session` per call owns the working entry list. Processing a
 * stylesheet recursively processes the assets it references, so the
 * session cache and the in-progress set are what keep shared assets from
 * being copied twice and reference loops from recursing forever.
 */

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use stamp_core_manifest::{sort_records, ManifestRecord};

use crate::config::StampConfig;
use crate::core::checksum::HashAlgorithm;
use crate::core::entry::{EntryBuilder, ManifestEntry};
use crate::core::filter::FilterList;
use crate::core::naming::{
    is_already_hashed, normalize_lexically, relative_to_source, virtual_dir, virtual_path,
};
use crate::core::plugin::{plugins_from_names, AssetPlugin};
use crate::core::rewrite::{is_stylesheet, rewrite_references};
use crate::error::{Result, StampError, EXIT_PARTIAL, EXIT_SUCCESS};
use crate::system::AssetSystem;

/// Everything a reconciliation needs besides the file list
pub struct ReconcileOptions {
    pub filter: FilterList,
    pub algorithm: HashAlgorithm,
    /// Rewrite references inside stylesheets
    pub process_css: bool,
    /// Record per-file errors instead of aborting
    pub continue_on_error: bool,
    pub plugins: Vec<Box<dyn AssetPlugin>>,
    /// Manifest location; never treated as an asset
    pub manifest_path: Option<PathBuf>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            filter: FilterList::new(),
            algorithm: HashAlgorithm::default(),
            process_css: true,
            continue_on_error: false,
            plugins: Vec::new(),
            manifest_path: None,
        }
    }
}

impl ReconcileOptions {
    /// Compile filters and instantiate plugins from a configuration
    pub fn from_config(config: &StampConfig) -> Result<Self> {
        Ok(Self {
            filter: FilterList::from_patterns(&config.include_patterns, &config.exclude_patterns)?,
            algorithm: HashAlgorithm::from_quick(config.quick_hash),
            process_css: config.process_css,
            continue_on_error: config.continue_on_error(),
            plugins: plugins_from_names(&config.plugins)?,
            manifest_path: None,
        })
    }

    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }
}

/// Counters collected during one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Hashed files copied or written
    pub materialized: usize,
    /// Carried-over entries confirmed without copying
    pub reused: usize,
    /// Files left out (already hashed, excluded, manifest)
    pub skipped: usize,
    /// Files whose error was recorded
    pub failed: usize,
}

/// Outcome of a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Persistable records, sorted by virtual path
    pub records: Vec<ManifestRecord>,
    /// `"<path>: <error>"` messages, in the order they occurred
    pub errors: Vec<String>,
    pub stats: ReconcileStats,
}

impl ReconcileReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_PARTIAL
        }
    }
}

/// Reconcile `files` against the hashed tree under `target_base`
///
/// With `previous`, the records of an earlier manifest are carried over as
/// unverified entries: unchanged files are confirmed without copying, changed
/// files replace their old entry, and entries never reconfirmed are kept.
pub fn reconcile(
    files: &[PathBuf],
    source_base: &Path,
    target_base: &Path,
    previous: Option<&[ManifestRecord]>,
    options: &ReconcileOptions,
    system: &dyn AssetSystem,
) -> Result<ReconcileReport> {
    let source_base = normalize_lexically(source_base);
    let target_base = normalize_lexically(target_base);

    let mut session = Session::new(&source_base, &target_base, options, system);
    if let Some(records) = previous {
        session.seed(records);
    }

    for file in files {
        session.process(file)?;
    }

    let report = session.finish();
    info!(
        assets = report.records.len(),
        materialized = report.stats.materialized,
        reused = report.stats.reused,
        skipped = report.stats.skipped,
        failed = report.stats.failed,
        "Reconciliation complete"
    );
    Ok(report)
}

/// What to put at the hashed location once an entry is accepted
enum Payload {
    /// Copy the source bytes unchanged
    Copy,
    /// Write rewritten stylesheet text
    Write(Vec<u8>),
}

struct Session<'a> {
    source_base: &'a Path,
    target_base: &'a Path,
    options: &'a ReconcileOptions,
    system: &'a dyn AssetSystem,
    builder: EntryBuilder<'a>,
    manifest_path: Option<PathBuf>,

    entries: Vec<ManifestEntry>,
    lookup: HashMap<PathBuf, usize>,
    in_progress: HashSet<PathBuf>,
    failed: HashSet<PathBuf>,
    skipped: HashSet<PathBuf>,
    /// Carried-over entries dropped because their file was skipped or failed
    retired: HashSet<usize>,
    errors: Vec<String>,
    stats: ReconcileStats,
}

impl<'a> Session<'a> {
    fn new(
        source_base: &'a Path,
        target_base: &'a Path,
        options: &'a ReconcileOptions,
        system: &'a dyn AssetSystem,
    ) -> Self {
        Self {
            source_base,
            target_base,
            options,
            system,
            builder: EntryBuilder::new(
                source_base,
                target_base,
                options.algorithm,
                &options.plugins,
            ),
            manifest_path: options.manifest_path.as_deref().map(normalize_lexically),
            entries: Vec::new(),
            lookup: HashMap::new(),
            in_progress: HashSet::new(),
            failed: HashSet::new(),
            skipped: HashSet::new(),
            retired: HashSet::new(),
            errors: Vec::new(),
            stats: ReconcileStats::default(),
        }
    }

    /// Carry over records from a previous manifest as unverified entries
    fn seed(&mut self, records: &[ManifestRecord]) {
        for record in records {
            let entry = ManifestEntry::from_record(record, self.source_base, self.target_base);
            self.lookup
                .insert(entry.physical_path.clone(), self.entries.len());
            self.entries.push(entry);
        }
        debug!(carried = records.len(), "Seeded entries from previous manifest");
    }

    /// Process one file behind the failure-isolation boundary
    fn process(&mut self, physical_path: &Path) -> Result<Option<ManifestEntry>> {
        let physical_path = normalize_lexically(physical_path);

        match self.process_unguarded(&physical_path) {
            Ok(entry) => Ok(entry),
            Err(err) if err.is_fatal() || !self.options.continue_on_error => Err(err),
            Err(err) => {
                if self.failed.insert(physical_path.clone()) {
                    warn!(path = %physical_path.display(), error = %err, "Failed to process asset");
                    self.stats.failed += 1;
                    self.errors
                        .push(format!("{}: {}", physical_path.display(), err));
                }
                self.retire(&physical_path);
                Ok(None)
            }
        }
    }

    fn process_unguarded(&mut self, path: &Path) -> Result<Option<ManifestEntry>> {
        if let Some(&index) = self.lookup.get(path) {
            if !self.entries[index].unverified {
                return Ok(Some(self.entries[index].clone()));
            }
        }
        if self.failed.contains(path) || self.skipped.contains(path) {
            return Ok(None);
        }

        let relative = relative_to_source(path, self.source_base)?;

        if is_already_hashed(path) {
            self.skip(path, "already-hashed");
            return Ok(None);
        }
        if self.manifest_path.as_deref() == Some(path) {
            self.skip(path, "manifest");
            return Ok(None);
        }
        if self.options.filter.should_exclude(&relative) {
            self.skip(path, "excluded");
            return Ok(None);
        }

        self.in_progress.insert(path.to_path_buf());
        let built = self.build(path, &relative);
        self.in_progress.remove(path);
        let (entry, payload) = built?;

        if let Some(index) = self.lookup.get(path).copied() {
            let carried = &self.entries[index];
            if carried.hashed_virtual_path == entry.hashed_virtual_path
                && self.system.is_file(&carried.hashed_physical_path)
            {
                let carried = &mut self.entries[index];
                carried.unverified = false;
                carried.hash_code = entry.hash_code;
                self.stats.reused += 1;
                debug!(path = %carried.virtual_path, "Confirmed carried-over entry");
                return Ok(Some(carried.clone()));
            }
        }

        self.materialize(path, &entry, &payload)?;
        self.stats.materialized += 1;

        match self.lookup.get(path).copied() {
            Some(index) => {
                debug!(
                    path = %entry.virtual_path,
                    previous = %self.entries[index].hashed_virtual_path,
                    current = %entry.hashed_virtual_path,
                    "Replaced carried-over entry"
                );
                self.entries[index] = entry.clone();
            }
            None => {
                self.lookup.insert(path.to_path_buf(), self.entries.len());
                self.entries.push(entry.clone());
            }
        }

        Ok(Some(entry))
    }

    fn skip(&mut self, path: &Path, reason: &'static str) {
        if self.skipped.insert(path.to_path_buf()) {
            self.stats.skipped += 1;
            debug!(path = %path.display(), reason, "Skipping file");
        }
        self.retire(path);
    }

    /// Drop the unverified carry-over for a file that is present but yields
    /// no entry this run
    fn retire(&mut self, path: &Path) {
        if let Some(&index) = self.lookup.get(path) {
            if self.entries[index].unverified && self.retired.insert(index) {
                debug!(path = %self.entries[index].virtual_path, "Dropped carried-over entry");
            }
        }
    }

    fn build(&mut self, path: &Path, relative: &Path) -> Result<(ManifestEntry, Payload)> {
        let bytes = self.system.read(path).map_err(|e| StampError::io(path, e))?;

        if !(self.options.process_css && is_stylesheet(path)) {
            let entry = self.builder.build(path, &bytes)?;
            return Ok((entry, Payload::Copy));
        }

        let text = String::from_utf8(bytes).map_err(|e| StampError::InvalidContent {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let own_virtual = virtual_path(relative);
        let source_base = self.source_base;
        let rewritten = rewrite_references(
            &text,
            path,
            virtual_dir(&own_virtual),
            source_base,
            |resolved| self.resolve_reference_entry(resolved, path),
        )?;
        debug!(
            stylesheet = %own_virtual,
            references = rewritten.references.len(),
            "Rewrote stylesheet references"
        );

        let data = rewritten.text.into_bytes();
        let entry = self.builder.build(path, &data)?;
        Ok((entry, Payload::Write(data)))
    }

    /// Entry to substitute for a stylesheet reference, if any
    fn resolve_reference_entry(
        &mut self,
        resolved: &Path,
        stylesheet: &Path,
    ) -> Result<Option<ManifestEntry>> {
        if !self.system.is_file(resolved) {
            debug!(
                stylesheet = %stylesheet.display(),
                reference = %resolved.display(),
                "Referenced file does not exist"
            );
            return Ok(None);
        }
        if self.in_progress.contains(resolved) {
            return Err(StampError::ReferenceCycle {
                path: resolved.to_path_buf(),
                via: stylesheet.to_path_buf(),
            });
        }
        self.process(resolved)
    }

    fn materialize(&self, source: &Path, entry: &ManifestEntry, payload: &Payload) -> Result<()> {
        let destination = &entry.hashed_physical_path;
        match payload {
            Payload::Copy => self.system.copy(source, destination),
            Payload::Write(data) => self.system.write(destination, data),
        }
        .map_err(|e| StampError::io(destination, e))?;

        debug!(
            source = %source.display(),
            destination = %destination.display(),
            "Materialized hashed file"
        );
        Ok(())
    }

    fn finish(self) -> ReconcileReport {
        let retired = &self.retired;
        let mut records: Vec<ManifestRecord> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(index, _)| !retired.contains(index))
            .map(|(_, entry)| entry.to_record())
            .collect();
        sort_records(&mut records);

        ReconcileReport {
            records,
            errors: self.errors,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    fn hash(data: &[u8]) -> String {
        HashAlgorithm::Sha256.fingerprint(data)
    }

    fn source_files(system: &MockSystem) -> Vec<PathBuf> {
        system.list_files(Path::new("/src")).unwrap()
    }

    fn run(
        system: &MockSystem,
        previous: Option<&[ManifestRecord]>,
        options: &ReconcileOptions,
    ) -> Result<ReconcileReport> {
        reconcile(
            &source_files(system),
            Path::new("/src"),
            Path::new("/dist"),
            previous,
            options,
            system,
        )
    }

    fn virtual_paths(report: &ReconcileReport) -> Vec<&str> {
        report
            .records
            .iter()
            .map(|r| r.virtual_path.as_str())
            .collect()
    }

    fn example_system() -> MockSystem {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"alpha");
        system.add_file("/src/style.css", b"body { background: url(img.png); }");
        system.add_file("/src/img.png", b"\x89PNG");
        system
    }

    #[test]
    fn test_example_scenario() {
        crate::logging::init_test_logging();
        let system = example_system();
        let report = run(&system, None, &ReconcileOptions::default()).unwrap();

        assert!(report.is_success());
        assert_eq!(virtual_paths(&report), vec!["/a.txt", "/img.png", "/style.css"]);
        assert_eq!(report.stats.materialized, 3);

        let img_hashed = format!("/img~{}.png", hash(b"\x89PNG"));
        assert_eq!(report.records[1].hashed_virtual_path, img_hashed);

        let css_text = format!("body {{ background: url(img~{}.png); }}", hash(b"\x89PNG"));
        let css_hashed = format!("/dist/style~{}.css", hash(css_text.as_bytes()));
        assert_eq!(
            system.get_data(Path::new(&css_hashed)).unwrap(),
            css_text.as_bytes()
        );
        assert_eq!(
            system
                .get_data(Path::new(&format!("/dist/a~{}.txt", hash(b"alpha"))))
                .unwrap(),
            b"alpha"
        );
    }

    #[test]
    fn test_partial_failure_continue() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        system.add_file("/src/b.txt", b"b");
        system.add_file("/src/c.txt", b"c");
        system.fail_writes_to(format!("/dist/b~{}.txt", hash(b"b")));

        let options = ReconcileOptions {
            continue_on_error: true,
            ..Default::default()
        };
        let report = run(&system, None, &options).unwrap();

        assert_eq!(virtual_paths(&report), vec!["/a.txt", "/c.txt"]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("/src/b.txt: "));
        assert!(report.errors[0].contains("injected write failure"));
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_partial_failure_abort() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        system.add_file("/src/b.txt", b"b");
        system.fail_writes_to(format!("/dist/b~{}.txt", hash(b"b")));

        let err = run(&system, None, &ReconcileOptions::default()).unwrap_err();
        assert!(matches!(err, StampError::Io { .. }));
    }

    #[test]
    fn test_amend_confirms_unchanged_entries() {
        let system = example_system();
        let first = run(&system, None, &ReconcileOptions::default()).unwrap();
        let writes = system.write_count();

        let second =
            run(&system, Some(first.records.as_slice()), &ReconcileOptions::default()).unwrap();

        assert_eq!(second.records, first.records);
        assert_eq!(second.stats.reused, 3);
        assert_eq!(second.stats.materialized, 0);
        assert_eq!(system.write_count(), writes);
    }

    #[test]
    fn test_amend_replaces_changed_entry() {
        let system = example_system();
        let first = run(&system, None, &ReconcileOptions::default()).unwrap();

        system.add_file("/src/a.txt", b"alpha, revised");
        let second =
            run(&system, Some(first.records.as_slice()), &ReconcileOptions::default()).unwrap();

        assert_eq!(virtual_paths(&second), vec!["/a.txt", "/img.png", "/style.css"]);
        assert_eq!(
            second.records[0].hashed_virtual_path,
            format!("/a~{}.txt", hash(b"alpha, revised"))
        );
        assert_eq!(second.stats.materialized, 1);
        assert_eq!(second.stats.reused, 2);
    }

    #[test]
    fn test_amend_keeps_unconfirmed_entries() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        let previous = vec![ManifestRecord::new(
            "/gone.txt",
            "/gone~0123456789abcdef.txt",
        )];

        let report =
            run(&system, Some(previous.as_slice()), &ReconcileOptions::default()).unwrap();
        assert_eq!(virtual_paths(&report), vec!["/a.txt", "/gone.txt"]);
    }

    #[test]
    fn test_amend_drops_newly_excluded_entry() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        system.add_file("/src/app.js.map", b"{}");
        let first = run(&system, None, &ReconcileOptions::default()).unwrap();
        assert_eq!(virtual_paths(&first), vec!["/a.txt", "/app.js.map"]);

        let options = ReconcileOptions {
            filter: FilterList::from_patterns(&[], &["*.map".to_string()]).unwrap(),
            ..Default::default()
        };
        let second = run(&system, Some(first.records.as_slice()), &options).unwrap();

        assert_eq!(virtual_paths(&second), vec!["/a.txt"]);
        assert_eq!(second.stats.skipped, 1);
        assert_eq!(second.stats.reused, 1);
    }

    #[test]
    fn test_amend_drops_carry_over_for_manifest_path() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        system.add_file("/src/manifest.json", b"[]");
        let previous = vec![
            ManifestRecord::new("/a.txt", format!("/a~{}.txt", hash(b"a"))),
            ManifestRecord::new("/manifest.json", "/manifest~0123456789abcdef.json"),
        ];

        let options = ReconcileOptions::default().with_manifest_path("/src/manifest.json");
        let report = run(&system, Some(previous.as_slice()), &options).unwrap();
        assert_eq!(virtual_paths(&report), vec!["/a.txt"]);
    }

    #[test]
    fn test_amend_drops_carry_over_of_failed_file() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        system.add_file("/src/b.txt", b"b");
        let first = run(&system, None, &ReconcileOptions::default()).unwrap();

        system.add_file("/src/b.txt", b"b, revised");
        system.fail_writes_to(format!("/dist/b~{}.txt", hash(b"b, revised")));
        let options = ReconcileOptions {
            continue_on_error: true,
            ..Default::default()
        };
        let second = run(&system, Some(first.records.as_slice()), &options).unwrap();

        assert_eq!(virtual_paths(&second), vec!["/a.txt"]);
        assert_eq!(second.errors.len(), 1);
        assert!(second.errors[0].starts_with("/src/b.txt: "));
    }

    #[test]
    fn test_amend_rematerializes_missing_hashed_file() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        let previous = vec![ManifestRecord::new(
            "/a.txt",
            format!("/a~{}.txt", hash(b"a")),
        )];

        let report =
            run(&system, Some(previous.as_slice()), &ReconcileOptions::default()).unwrap();
        assert_eq!(report.records, previous);
        assert_eq!(report.stats.materialized, 1);
        assert!(system.is_file(Path::new(&format!("/dist/a~{}.txt", hash(b"a")))));
    }

    #[test]
    fn test_reference_cycle_is_per_file_error() {
        crate::logging::init_test_logging();
        let system = MockSystem::new();
        system.add_file("/src/a.css", b"@import \"b.css\";");
        system.add_file("/src/b.css", b"@import \"a.css\";");

        let options = ReconcileOptions {
            continue_on_error: true,
            ..Default::default()
        };
        let report = run(&system, None, &options).unwrap();

        assert_eq!(virtual_paths(&report), vec!["/a.css"]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("/src/b.css: Reference cycle"));

        let err = run(&system, None, &ReconcileOptions::default()).unwrap_err();
        assert!(matches!(err, StampError::ReferenceCycle { .. }));
    }

    #[test]
    fn test_skips_hashed_excluded_and_manifest() {
        let system = MockSystem::new();
        system.add_file("/src/a.txt", b"a");
        system.add_file("/src/b~0123456789abcdef.txt", b"b");
        system.add_file("/src/app.js.map", b"{}");
        system.add_file("/src/manifest.json", b"[]");

        let options = ReconcileOptions {
            filter: FilterList::from_patterns(&[], &["*.map".to_string()]).unwrap(),
            ..Default::default()
        }
        .with_manifest_path("/src/manifest.json");
        let report = run(&system, None, &options).unwrap();

        assert_eq!(virtual_paths(&report), vec!["/a.txt"]);
        assert!(report.errors.is_empty());
        assert_eq!(report.stats.skipped, 3);
    }

    #[test]
    fn test_excluded_reference_left_unchanged() {
        let system = MockSystem::new();
        system.add_file("/src/site.css", b"a { background: url(/raw/bg.png); }");
        system.add_file("/src/raw/bg.png", b"png");

        let options = ReconcileOptions {
            filter: FilterList::from_patterns(&[], &["raw/**".to_string()]).unwrap(),
            ..Default::default()
        };
        let report = run(&system, None, &options).unwrap();

        assert_eq!(virtual_paths(&report), vec!["/site.css"]);
        let text = b"a { background: url(/raw/bg.png); }";
        let hashed = format!("/dist/site~{}.css", hash(text));
        assert_eq!(system.get_data(Path::new(&hashed)).unwrap(), text);
    }

    #[test]
    fn test_outside_source_is_fatal_when_continuing() {
        let system = MockSystem::new();
        system.add_file("/elsewhere/x.txt", b"x");

        let options = ReconcileOptions {
            continue_on_error: true,
            ..Default::default()
        };
        let err = reconcile(
            &[PathBuf::from("/elsewhere/x.txt")],
            Path::new("/src"),
            Path::new("/dist"),
            None,
            &options,
            &system,
        )
        .unwrap_err();
        assert!(matches!(err, StampError::OutsideSource { .. }));
    }

    #[test]
    fn test_invalid_stylesheet_recorded() {
        let system = MockSystem::new();
        system.add_file("/src/bad.css", &[0xff, 0xfe, 0x00]);
        system.add_file("/src/ok.txt", b"ok");

        let options = ReconcileOptions {
            continue_on_error: true,
            ..Default::default()
        };
        let report = run(&system, None, &options).unwrap();

        assert_eq!(virtual_paths(&report), vec!["/ok.txt"]);
        assert!(report.errors[0].contains("Invalid content"));
    }

    #[test]
    fn test_css_processing_disabled_copies_verbatim() {
        let system = example_system();
        let options = ReconcileOptions {
            process_css: false,
            ..Default::default()
        };
        let report = run(&system, None, &options).unwrap();

        let raw = b"body { background: url(img.png); }";
        assert_eq!(
            report.records[2].hashed_virtual_path,
            format!("/style~{}.css", hash(raw))
        );
    }

    #[test]
    fn test_shared_reference_materialized_once() {
        let system = MockSystem::new();
        system.add_file("/src/a.css", b"x { background: url(img/p.png); }");
        system.add_file("/src/b.css", b"y { background: url(/img/p.png); }");
        system.add_file("/src/img/p.png", b"p");

        let report = run(&system, None, &ReconcileOptions::default()).unwrap();
        assert_eq!(report.stats.materialized, 3);
        assert_eq!(system.write_count(), 3);
        assert_eq!(virtual_paths(&report), vec!["/a.css", "/b.css", "/img/p.png"]);
    }

    #[test]
    fn test_options_from_config_rejects_unknown_plugin() {
        let config = StampConfig {
            plugins: vec!["nope".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ReconcileOptions::from_config(&config),
            Err(StampError::Config(_))
        ));
    }
}
