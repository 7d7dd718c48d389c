use anyhow::{Context, Result};
use serde::Serialize;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;

pub const CLASS_SUFFIX: &str = ".class";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub file_name: String,
    pub directory: String,
    pub full_path: String,
    pub checksum: u64,
    pub last_modified: u64,
    pub size_bytes: u64,
    pub owning_archive: String,
    pub is_checksum_match: bool,
    pub is_name_match: bool,
}

impl FileEntry {
    pub fn from_archive_entry(
        archive: &str,
        name: &str,
        checksum: u64,
        size_bytes: u64,
        last_modified: u64,
    ) -> Self {
        let (directory, file_name) = split_entry_name(name);
        Self {
            file_name: file_name.to_string(),
            directory: directory.to_string(),
            full_path: name.to_string(),
            checksum,
            last_modified,
            size_bytes,
            owning_archive: archive.to_string(),
            is_checksum_match: false,
            is_name_match: false,
        }
    }

    /// Builds an entry for a file on disk. The checksum is the CRC-32 of
    /// its contents so it compares with archive entry checksums.
    pub fn from_standalone(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat file: {}", path.display()))?;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| u64::try_from(DateTime::<Utc>::from(t).timestamp()).ok())
            .unwrap_or(0);

        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(Self {
            file_name: absolute
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            directory: absolute
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            full_path: absolute.to_string_lossy().to_string(),
            checksum: u64::from(crc32fast::hash(&bytes)),
            last_modified,
            size_bytes: bytes.len() as u64,
            owning_archive: String::new(),
            is_checksum_match: false,
            is_name_match: false,
        })
    }

    pub fn is_standalone(&self) -> bool {
        self.owning_archive.is_empty()
    }

    pub fn is_class(&self) -> bool {
        self.full_path.ends_with(CLASS_SUFFIX)
    }

    pub fn class_name(&self) -> Option<String> {
        if self.is_standalone() {
            return None;
        }
        self.full_path
            .strip_suffix(CLASS_SUFFIX)
            .map(|n| n.replace('\\', "/"))
    }
}

pub fn split_entry_name(name: &str) -> (&str, &str) {
    match name.rfind(['/', '\\']) {
        Some(at) => (&name[..at], &name[at + 1..]),
        None => ("", name),
    }
}

/// Seconds since the Unix epoch for a zip entry's local timestamp, read as
/// UTC. Out-of-range DOS fields yield 0.
pub fn zip_time_to_unix(time: zip::DateTime) -> u64 {
    NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )
    .and_then(|date| {
        date.and_hms_opt(
            u32::from(time.hour()),
            u32::from(time.minute()),
            u32::from(time.second()),
        )
    })
    .and_then(|at| u64::try_from(at.and_utc().timestamp()).ok())
    .unwrap_or(0)
}
