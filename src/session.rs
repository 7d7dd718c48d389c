use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive;
use crate::class_file::parse_class;
use crate::descriptor::ClassDescriptor;
use crate::duplicates::detect_duplicates;
use crate::entry::{CLASS_SUFFIX, FileEntry};
use crate::error::ClassFileError;
use crate::manifest::Manifest;
use crate::references::extract_references;
use crate::resolver::{self, ClassLookup};
use crate::scan::class_name_to_entry_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub recurse: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { recurse: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Archive,
    ClassFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveStatus {
    pub path: String,
    pub found: bool,
    pub entry_count: usize,
    pub size_bytes: u64,
    pub last_modified: u64,
}

impl ArchiveStatus {
    fn not_found(path: &Path) -> Self {
        Self {
            path: path.to_string_lossy().to_string(),
            found: false,
            entry_count: 0,
            size_bytes: 0,
            last_modified: 0,
        }
    }

    fn found(path: &Path, entry_count: usize) -> Self {
        let metadata = std::fs::metadata(path).ok();
        Self {
            path: path.to_string_lossy().to_string(),
            found: true,
            entry_count,
            size_bytes: metadata.as_ref().map(|m| m.len()).unwrap_or(0),
            last_modified: metadata
                .and_then(|m| m.modified().ok())
                .and_then(|t| u64::try_from(DateTime::<Utc>::from(t).timestamp()).ok())
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub archive: String,
    pub entry: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub scanned_entries: usize,
    pub missing: BTreeSet<String>,
    pub failures: Vec<EntryFailure>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceReport {
    pub scanned_entries: usize,
    pub referenced: BTreeSet<String>,
    pub failures: Vec<EntryFailure>,
}

struct ClassSource {
    archive: String,
    entry: String,
    self_name: Option<String>,
    bytes: Vec<u8>,
}

struct ScannedClass {
    self_name: Option<String>,
    references: Vec<String>,
}

#[derive(Debug)]
pub struct Session {
    root: PathBuf,
    kind: SessionKind,
    manifest: Option<Manifest>,
    archives: Vec<ArchiveStatus>,
    entries: Vec<FileEntry>,
    provided: HashSet<String>,
}

impl Session {
    pub fn open(path: &Path, options: &SessionOptions) -> Result<Self> {
        if path.extension().is_some_and(|e| e == "class") {
            Self::open_class_file(path)
        } else {
            Self::open_archive(path, options)
        }
    }

    pub fn open_archive(path: &Path, options: &SessionOptions) -> Result<Self> {
        let mut entries = archive::list_entries(path)
            .with_context(|| format!("The file appears to be invalid: {}", path.display()))?;
        let mut archives = vec![ArchiveStatus::found(path, entries.len())];

        let manifest = match archive::read_manifest(path) {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!(archive = %path.display(), error = %err, "ignoring unreadable manifest");
                None
            }
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let class_path: Vec<PathBuf> = manifest
            .as_ref()
            .map(|m| m.class_path().into_iter().map(|p| base.join(p)).collect())
            .unwrap_or_default();

        for dependency in &class_path {
            archives.push(Self::open_dependency(dependency, options, &mut entries));
        }

        let flagged = detect_duplicates(&entries).apply(&mut entries);
        let provided = resolver::provided_classes(&entries);
        info!(
            archive = %path.display(),
            archives = archives.len(),
            entries = entries.len(),
            provided = provided.len(),
            duplicate_flags = flagged,
            "opened archive session"
        );

        Ok(Self {
            root: path.to_path_buf(),
            kind: SessionKind::Archive,
            manifest,
            archives,
            entries,
            provided,
        })
    }

    fn open_dependency(path: &Path, options: &SessionOptions, entries: &mut Vec<FileEntry>) -> ArchiveStatus {
        if !path.is_file() {
            debug!(archive = %path.display(), "class-path archive not found");
            return ArchiveStatus::not_found(path);
        }

        let listed = if options.recurse {
            archive::list_entries(path).map(|listed| {
                let count = listed.len();
                entries.extend(listed);
                count
            })
        } else {
            archive::entry_count(path)
        };

        match listed {
            Ok(count) => ArchiveStatus::found(path, count),
            Err(err) => {
                warn!(archive = %path.display(), error = %err, "skipping unreadable class-path archive");
                ArchiveStatus::not_found(path)
            }
        }
    }

    pub fn open_class_file(path: &Path) -> Result<Self> {
        let entry = FileEntry::from_standalone(path)?;
        let entries = vec![entry];
        Ok(Self {
            root: path.to_path_buf(),
            kind: SessionKind::ClassFile,
            manifest: None,
            archives: Vec::new(),
            entries,
            provided: HashSet::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn archives(&self) -> &[ArchiveStatus] {
        &self.archives
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn provided(&self) -> &HashSet<String> {
        &self.provided
    }

    pub fn name_matches(&self) -> Vec<&FileEntry> {
        self.entries.iter().filter(|e| e.is_name_match).collect()
    }

    pub fn checksum_matches(&self) -> Vec<&FileEntry> {
        self.entries.iter().filter(|e| e.is_checksum_match).collect()
    }

    /// Looks an entry up by entry path (`com/foo/Bar.class`), internal name
    /// (`com/foo/Bar`) or dotted name (`com.foo.Bar`). A class file session
    /// also matches its file name.
    pub fn find_entry(&self, name: &str) -> Option<&FileEntry> {
        let wanted = class_name_to_entry_path(name);
        self.entries.iter().find(|e| {
            e.full_path == name
                || e.full_path == wanted
                || (e.is_standalone() && (e.file_name == name || e.file_name == wanted))
        })
    }

    pub fn read_bytes(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        if entry.is_standalone() {
            return std::fs::read(&entry.full_path)
                .with_context(|| format!("Failed to read class file: {}", entry.full_path));
        }
        archive::read_entry(Path::new(&entry.owning_archive), &entry.full_path)
    }

    pub fn describe(&self, entry: &FileEntry) -> Result<ClassDescriptor> {
        let bytes = self.read_bytes(entry)?;
        let descriptor = parse_class(&bytes)
            .into_result()
            .with_context(|| format!("Failed to parse {}", entry.full_path))?;
        Ok(descriptor)
    }

    pub fn included(&self, entry: &FileEntry) -> Result<BTreeSet<String>> {
        let bytes = self.read_bytes(entry)?;
        let refs = extract_references(&bytes)
            .with_context(|| format!("Failed to scan {}", entry.full_path))?;
        Ok(resolver::included(refs))
    }

    pub fn missing(&self, entry: &FileEntry, system: &dyn ClassLookup) -> Result<BTreeSet<String>> {
        let bytes = self.read_bytes(entry)?;
        let refs = extract_references(&bytes)
            .with_context(|| format!("Failed to scan {}", entry.full_path))?;
        let self_name = parse_class(&bytes)
            .descriptor
            .class_name()
            .map(str::to_string)
            .or_else(|| entry.class_name());
        Ok(resolver::missing(refs, &self.provided, system, self_name.as_deref()))
    }

    pub fn verify(&self, system: &dyn ClassLookup) -> VerifyReport {
        let (scanned, mut failures) = self.scan_classes();
        let mut report = VerifyReport::default();
        for class in scanned {
            report.scanned_entries += 1;
            report.missing.extend(resolver::missing(
                class.references,
                &self.provided,
                system,
                class.self_name.as_deref(),
            ));
        }
        report.failures.append(&mut failures);
        report
    }

    pub fn referenced(&self) -> ReferenceReport {
        let (scanned, failures) = self.scan_classes();
        let mut report = ReferenceReport {
            failures,
            ..ReferenceReport::default()
        };
        for class in scanned {
            report.scanned_entries += 1;
            report.referenced.extend(class.references);
        }
        report
    }

    fn scan_classes(&self) -> (Vec<ScannedClass>, Vec<EntryFailure>) {
        let (sources, mut failures) = self.class_sources();

        let results: Vec<(ClassSource, Result<Vec<String>, ClassFileError>)> = sources
            .into_par_iter()
            .map(|source| {
                let refs = extract_references(&source.bytes);
                (source, refs)
            })
            .collect();

        let mut scanned = Vec::with_capacity(results.len());
        for (source, refs) in results {
            match refs {
                Ok(references) => scanned.push(ScannedClass {
                    self_name: source.self_name,
                    references,
                }),
                Err(err) => {
                    if err.is_structural() {
                        warn!(archive = %source.archive, entry = %source.entry, error = %err, "skipping class");
                    } else {
                        debug!(archive = %source.archive, entry = %source.entry, error = %err, "skipping class");
                    }
                    failures.push(EntryFailure {
                        archive: source.archive,
                        entry: source.entry,
                        error: err.to_string(),
                    });
                }
            }
        }
        (scanned, failures)
    }

    fn class_sources(&self) -> (Vec<ClassSource>, Vec<EntryFailure>) {
        let mut sources = Vec::new();
        let mut failures = Vec::new();

        if self.kind == SessionKind::ClassFile {
            for entry in &self.entries {
                match self.read_bytes(entry) {
                    Ok(bytes) => sources.push(ClassSource {
                        archive: String::new(),
                        entry: entry.full_path.clone(),
                        self_name: parse_class(&bytes).descriptor.class_name().map(str::to_string),
                        bytes,
                    }),
                    Err(err) => failures.push(EntryFailure {
                        archive: String::new(),
                        entry: entry.full_path.clone(),
                        error: format!("{err:#}"),
                    }),
                }
            }
            return (sources, failures);
        }

        for status in self.archives.iter().filter(|s| s.found) {
            match archive::read_class_entries(Path::new(&status.path)) {
                Ok(classes) => {
                    for (name, bytes) in classes {
                        sources.push(ClassSource {
                            archive: status.path.clone(),
                            self_name: name.strip_suffix(CLASS_SUFFIX).map(str::to_string),
                            entry: name,
                            bytes,
                        });
                    }
                }
                Err(err) => {
                    warn!(archive = %status.path, error = %err, "failed to read class entries");
                    failures.push(EntryFailure {
                        archive: status.path.clone(),
                        entry: String::new(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        (sources, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ClassBuilder, temp_path, write_jar};

    fn class_bytes(name: &str, parent: &str, uses: &[&str]) -> Vec<u8> {
        let mut b = ClassBuilder::named(52, name, parent);
        for used in uses {
            b.class(used);
        }
        b.build()
    }

    struct Fixture {
        dir: PathBuf,
        app: PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn fixture() -> Result<Fixture> {
        let dir = temp_path("session");
        std::fs::create_dir_all(&dir)?;
        let app = dir.join("app.jar");
        let lib = dir.join("lib.jar");

        let main = class_bytes("com/acme/Main", "java/lang/Object", &["com/lib/Util", "org/gone/Thing"]);
        let util = class_bytes("com/lib/Util", "java/lang/Object", &["java/lang/String"]);
        write_jar(
            &app,
            &[
                (
                    "META-INF/MANIFEST.MF",
                    &b"Manifest-Version: 1.0\nMain-Class: com.acme.Main\nClass-Path: lib.jar missing.jar\n"[..],
                ),
                ("com/acme/Main.class", &main[..]),
                ("com/shared/Config.class", &util[..]),
                ("broken/Bad.class", &b"\x00\x01\x02\x03"[..]),
            ],
        )?;
        write_jar(
            &lib,
            &[
                ("com/lib/Util.class", &util[..]),
                ("com/shared/Config.class", &util[..]),
            ],
        )?;
        Ok(Fixture { dir, app })
    }

    fn system() -> HashSet<String> {
        ["java/lang/Object", "java/lang/String"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn archive_session_follows_manifest_class_path() -> Result<()> {
        let fx = fixture()?;
        let session = Session::open(&fx.app, &SessionOptions::default())?;

        assert_eq!(session.kind(), SessionKind::Archive);
        assert_eq!(session.manifest().and_then(|m| m.main_class()), Some("com.acme.Main"));
        let found: Vec<bool> = session.archives().iter().map(|a| a.found).collect();
        assert_eq!(found, vec![true, true, false]);
        assert_eq!(session.archives()[1].entry_count, 2);
        assert!(session.provided().contains("com/lib/Util"));

        let names: Vec<_> = session.name_matches().iter().map(|e| e.owning_archive.clone()).collect();
        assert_eq!(names.len(), 2);
        assert_eq!(session.checksum_matches().len(), 2);
        Ok(())
    }

    #[test]
    fn no_recurse_counts_dependencies_without_listing() -> Result<()> {
        let fx = fixture()?;
        let session = Session::open(&fx.app, &SessionOptions { recurse: false })?;
        assert_eq!(session.archives()[1].entry_count, 2);
        assert!(!session.provided().contains("com/lib/Util"));
        assert!(session.name_matches().is_empty());
        Ok(())
    }

    #[test]
    fn per_entry_operations() -> Result<()> {
        let fx = fixture()?;
        let session = Session::open(&fx.app, &SessionOptions::default())?;

        let entry = session.find_entry("com.acme.Main").expect("entry");
        assert_eq!(session.find_entry("com/acme/Main").map(|e| &e.full_path), Some(&entry.full_path));
        assert!(session.find_entry("com.acme.Nope").is_none());

        let described = session.describe(entry)?;
        assert_eq!(described.class_name(), Some("com/acme/Main"));

        let included = session.included(entry)?;
        assert!(included.contains("org/gone/Thing") && included.contains("com/acme/Main"));

        let missing = session.missing(entry, &system())?;
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["org/gone/Thing".to_string()]);

        let bad = session.find_entry("broken/Bad.class").expect("bad entry");
        let err = session.describe(bad).unwrap_err();
        assert!(err.chain().any(|c| c.is::<ClassFileError>()));
        Ok(())
    }

    #[test]
    fn verify_collects_missing_and_failures() -> Result<()> {
        let fx = fixture()?;
        let session = Session::open(&fx.app, &SessionOptions::default())?;

        let report = session.verify(&system());
        assert_eq!(report.scanned_entries, 4);
        assert_eq!(report.missing.iter().collect::<Vec<_>>(), vec!["org/gone/Thing"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].entry, "broken/Bad.class");

        let referenced = session.referenced();
        assert_eq!(referenced.scanned_entries, 4);
        assert!(referenced.referenced.contains("java/lang/String"));
        Ok(())
    }

    #[test]
    fn class_file_session_has_one_standalone_entry() -> Result<()> {
        let dir = temp_path("session_class");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("Solo.class");
        std::fs::write(&path, class_bytes("demo/Solo", "demo/Base", &[]))?;

        let session = Session::open(&path, &SessionOptions::default())?;
        assert_eq!(session.kind(), SessionKind::ClassFile);
        assert!(session.provided().is_empty());
        assert!(session.archives().is_empty());

        let entry = session.find_entry("Solo.class").expect("entry");
        let missing = session.missing(entry, &system())?;
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["demo/Base".to_string()]);

        let report = session.verify(&system());
        assert_eq!(report.scanned_entries, 1);
        assert!(report.missing.contains("demo/Base"));

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn invalid_root_archive_is_an_error() -> Result<()> {
        let path = temp_path("bogus.jar");
        std::fs::write(&path, b"not a zip")?;
        assert!(Session::open(&path, &SessionOptions::default()).is_err());
        std::fs::remove_file(path)?;
        Ok(())
    }
}
