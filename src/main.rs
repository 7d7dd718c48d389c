use anyhow::{Context, Result, anyhow};
use clap::Parser;
use class_deps::cli::{Cli, Commands, OutputFormat};
use class_deps::config::{init_logging, resolve_system_classpath};
use class_deps::descriptor::ClassSummary;
use class_deps::entry::FileEntry;
use class_deps::error::ClassFileError;
use class_deps::manifest::Manifest;
use class_deps::session::{
    ArchiveStatus, EntryFailure, ReferenceReport, Session, SessionKind, SessionOptions, VerifyReport,
};
use class_deps::system::{SystemArchiveFailure, SystemClassCache};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

const INVALID_CLASS_MESSAGE: &str = "not a valid compiled Java class file";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = SessionOptions {
        recurse: !cli.no_recurse,
    };
    let system = SystemClassCache::new(resolve_system_classpath(&cli)?);
    debug!(archives = system.classpath().len(), "resolved system classpath");

    match cli.command.clone() {
        Commands::Info { path, entry } => {
            let output = info(&path, entry.as_deref(), &options)?;
            write_output(&output, cli.format)?;
        }
        Commands::Refs { path, entry } => {
            let output = refs(&path, entry.as_deref(), &options)?;
            write_output(&output, cli.format)?;
        }
        Commands::Missing { path, entry } => {
            let output = missing(&path, entry.as_deref(), &options, &system)?;
            write_output(&output, cli.format)?;
        }
        Commands::Verify { path } => {
            let start = Instant::now();
            let session = Session::open(&path, &options)?;
            let classes = system.get();
            let report = session.verify(classes);
            let output = VerifyOutput {
                path: path.to_string_lossy().to_string(),
                system_classes: classes.len(),
                system_failures: classes.failures().to_vec(),
                duration_ms: start.elapsed().as_millis() as u64,
                report,
            };
            write_output(&output, cli.format)?;
        }
        Commands::References { path } => {
            let start = Instant::now();
            let session = Session::open(&path, &options)?;
            let output = ReferencesOutput {
                path: path.to_string_lossy().to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                report: session.referenced(),
            };
            write_output(&output, cli.format)?;
        }
        Commands::Duplicates { path } => {
            let session = Session::open(&path, &options)?;
            let output = DuplicatesOutput {
                path: path.to_string_lossy().to_string(),
                name_matches: session.name_matches().into_iter().cloned().collect(),
                checksum_matches: session.checksum_matches().into_iter().cloned().collect(),
            };
            write_output(&output, cli.format)?;
        }
        Commands::Entries { path } => {
            let session = Session::open(&path, &options)?;
            let output = EntriesOutput {
                path: path.to_string_lossy().to_string(),
                entries: session.entries().to_vec(),
            };
            write_output(&output, cli.format)?;
        }
        Commands::Archives { path } => {
            let session = Session::open(&path, &options)?;
            let output = ArchivesOutput::from_session(&session);
            write_output(&output, cli.format)?;
        }
    }

    Ok(())
}

/// Collapses any class-file decoding failure into the single user-facing
/// message. I/O and archive errors pass through unchanged.
fn class_failure(err: anyhow::Error) -> anyhow::Error {
    if err.chain().any(|cause| cause.is::<ClassFileError>()) {
        debug!("class parse failed: {err:#}");
        return anyhow!(INVALID_CLASS_MESSAGE);
    }
    err
}

/// The entry named on the command line, the only entry of a class file,
/// or the manifest Main-Class of an archive.
fn select_entry<'s>(session: &'s Session, entry: Option<&str>) -> Result<&'s FileEntry> {
    if let Some(name) = entry {
        return session
            .find_entry(name)
            .with_context(|| format!("Entry {name} not found in {}", session.root().display()));
    }

    if session.kind() == SessionKind::ClassFile {
        return session.entries().first().context("Class file session has no entry");
    }

    let main_class = session.manifest().and_then(Manifest::main_class).with_context(|| {
        format!(
            "{} has no Main-Class; choose a class with --entry",
            session.root().display()
        )
    })?;
    session
        .find_entry(main_class)
        .with_context(|| format!("Main-Class {main_class} not found in {}", session.root().display()))
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    source: String,
    entry: String,
    class: ClassSummary,
    #[serde(skip)]
    text: String,
}

#[derive(Debug, Serialize)]
struct RefsOutput {
    source: String,
    entry: String,
    referenced: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
struct MissingOutput {
    source: String,
    entry: String,
    system_classes: usize,
    system_failures: Vec<SystemArchiveFailure>,
    missing: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
struct VerifyOutput {
    path: String,
    system_classes: usize,
    system_failures: Vec<SystemArchiveFailure>,
    duration_ms: u64,
    #[serde(flatten)]
    report: VerifyReport,
}

#[derive(Debug, Serialize)]
struct ReferencesOutput {
    path: String,
    duration_ms: u64,
    #[serde(flatten)]
    report: ReferenceReport,
}

#[derive(Debug, Serialize)]
struct DuplicatesOutput {
    path: String,
    name_matches: Vec<FileEntry>,
    checksum_matches: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
struct EntriesOutput {
    path: String,
    entries: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
struct ArchivesOutput {
    path: String,
    kind: SessionKind,
    main_class: Option<String>,
    class_path: Vec<String>,
    manifest: Vec<(String, String)>,
    archives: Vec<ArchiveStatus>,
}

impl ArchivesOutput {
    fn from_session(session: &Session) -> Self {
        let manifest = session.manifest();
        Self {
            path: session.root().to_string_lossy().to_string(),
            kind: session.kind(),
            main_class: manifest.and_then(Manifest::main_class).map(str::to_string),
            class_path: manifest
                .map(|m| m.class_path().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
            manifest: manifest.map(|m| m.attributes.clone()).unwrap_or_default(),
            archives: session.archives().to_vec(),
        }
    }
}

fn info(path: &Path, entry: Option<&str>, options: &SessionOptions) -> Result<InfoOutput> {
    let session = Session::open(path, options)?;
    let selected = select_entry(&session, entry)?;
    let class = session.describe(selected).map_err(class_failure)?;
    Ok(InfoOutput {
        source: path.to_string_lossy().to_string(),
        entry: selected.full_path.clone(),
        class: class.summary(),
        text: class.render_text(),
    })
}

fn refs(path: &Path, entry: Option<&str>, options: &SessionOptions) -> Result<RefsOutput> {
    let session = Session::open(path, options)?;
    let selected = select_entry(&session, entry)?;
    Ok(RefsOutput {
        source: path.to_string_lossy().to_string(),
        entry: selected.full_path.clone(),
        referenced: session.included(selected).map_err(class_failure)?,
    })
}

fn missing(
    path: &Path,
    entry: Option<&str>,
    options: &SessionOptions,
    system: &SystemClassCache,
) -> Result<MissingOutput> {
    let session = Session::open(path, options)?;
    let selected = select_entry(&session, entry)?;
    let classes = system.get();
    Ok(MissingOutput {
        source: path.to_string_lossy().to_string(),
        entry: selected.full_path.clone(),
        system_classes: classes.len(),
        system_failures: classes.failures().to_vec(),
        missing: session.missing(selected, classes).map_err(class_failure)?,
    })
}

trait TextOutput {
    fn to_text(&self) -> String;
}

fn push_names<'a>(out: &mut String, title: &str, empty: &str, names: impl IntoIterator<Item = &'a String>) {
    let mut names = names.into_iter().peekable();
    if names.peek().is_none() {
        let _ = writeln!(out, "{empty}");
        return;
    }
    let _ = writeln!(out, "{title}:");
    for name in names {
        let _ = writeln!(out, "  {name}");
    }
}

fn push_system_failures(out: &mut String, failures: &[SystemArchiveFailure]) {
    for failure in failures {
        let _ = writeln!(out, "- system archive skipped: {}: {}", failure.archive, failure.error);
    }
}

fn push_failures(out: &mut String, failures: &[EntryFailure]) {
    for failure in failures {
        let _ = writeln!(
            out,
            "- failed: {} {}: {}",
            failure.archive, failure.entry, failure.error
        );
    }
}

impl TextOutput for InfoOutput {
    fn to_text(&self) -> String {
        self.text.clone()
    }
}

impl TextOutput for RefsOutput {
    fn to_text(&self) -> String {
        let mut out = format!("entry: {}\n", self.entry);
        push_names(&mut out, "Referenced classes", "No referenced classes", &self.referenced);
        out
    }
}

impl TextOutput for MissingOutput {
    fn to_text(&self) -> String {
        let mut out = format!("entry: {}\n", self.entry);
        push_names(&mut out, "Missing classes", "No missing classes", &self.missing);
        push_system_failures(&mut out, &self.system_failures);
        out
    }
}

impl TextOutput for VerifyOutput {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "scanned_entries: {}", self.report.scanned_entries);
        let _ = writeln!(out, "system_classes: {}", self.system_classes);
        let _ = writeln!(out, "duration_ms: {}", self.duration_ms);
        push_names(&mut out, "Missing classes", "No missing classes", &self.report.missing);
        push_failures(&mut out, &self.report.failures);
        push_system_failures(&mut out, &self.system_failures);
        out
    }
}

impl TextOutput for ReferencesOutput {
    fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "scanned_entries: {}", self.report.scanned_entries);
        let _ = writeln!(out, "duration_ms: {}", self.duration_ms);
        push_names(&mut out, "Referenced classes", "No referenced classes", &self.report.referenced);
        push_failures(&mut out, &self.report.failures);
        out
    }
}

impl TextOutput for DuplicatesOutput {
    fn to_text(&self) -> String {
        let mut out = String::new();
        if self.name_matches.is_empty() {
            out.push_str("No duplicate entries\n");
            return out;
        }
        for entry in &self.name_matches {
            let _ = writeln!(
                out,
                "- {} in {} (crc {:08x}{})",
                entry.full_path,
                entry.owning_archive,
                entry.checksum,
                if entry.is_checksum_match { ", identical" } else { "" }
            );
        }
        out
    }
}

impl TextOutput for EntriesOutput {
    fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let mut flags = Vec::new();
            if entry.is_name_match {
                flags.push("name");
            }
            if entry.is_checksum_match {
                flags.push("crc");
            }
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{:08x}\t{}\t{}\t{}",
                entry.file_name,
                entry.directory,
                entry.last_modified,
                entry.checksum,
                entry.size_bytes,
                entry.owning_archive,
                flags.join(",")
            );
        }
        out
    }
}

impl TextOutput for ArchivesOutput {
    fn to_text(&self) -> String {
        let mut out = String::new();
        for archive in &self.archives {
            let _ = writeln!(
                out,
                "- {} found: {}, entries: {}, size: {}",
                archive.path, archive.found, archive.entry_count, archive.size_bytes
            );
        }
        for (key, value) in &self.manifest {
            let _ = writeln!(out, "{key}: {value}");
        }
        out
    }
}

fn write_output<T: Serialize + TextOutput>(value: &T, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Text => value.to_text(),
    };

    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}
