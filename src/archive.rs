use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::entry::{CLASS_SUFFIX, FileEntry, zip_time_to_unix};
use crate::manifest::{MANIFEST_PATH, Manifest};

const MAX_PREALLOCATED_ENTRY: u64 = 1 << 20;

// The declared size comes from the archive and is not trusted; reads grow
// the buffer past the hint when needed.
fn size_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATED_ENTRY) as usize
}

fn open_archive(archive_path: &Path) -> Result<(File, Mmap)> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    // SAFETY: The file is opened read-only and outlives the mapping; the
    // mapping is only read through the zip reader below.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to mmap archive: {}", archive_path.display()))?;
    Ok((file, mmap))
}

fn zip_reader<'a>(archive_path: &Path, mmap: &'a Mmap) -> Result<ZipArchive<Cursor<&'a [u8]>>> {
    ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("Failed to read zip structure: {}", archive_path.display()))
}

pub fn entry_count(archive_path: &Path) -> Result<usize> {
    let (_file, mmap) = open_archive(archive_path)?;
    Ok(zip_reader(archive_path, &mmap)?.len())
}

/// Every file entry in the archive, in central directory order. Directory
/// records are skipped.
pub fn list_entries(archive_path: &Path) -> Result<Vec<FileEntry>> {
    let (_file, mmap) = open_archive(archive_path)?;
    let mut archive = zip_reader(archive_path, &mmap)?;
    let owner = archive_path.to_string_lossy().to_string();

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name();
        if entry.is_dir() || name.ends_with('/') || name.ends_with('\\') {
            continue;
        }
        entries.push(FileEntry::from_archive_entry(
            &owner,
            name,
            u64::from(entry.crc32()),
            entry.size(),
            zip_time_to_unix(entry.last_modified()),
        ));
    }
    Ok(entries)
}

pub fn read_entry(archive_path: &Path, entry_name: &str) -> Result<Vec<u8>> {
    let (_file, mmap) = open_archive(archive_path)?;
    let mut archive = zip_reader(archive_path, &mmap)?;
    let mut entry = archive.by_name(entry_name).with_context(|| {
        format!("Entry {entry_name} not found in {}", archive_path.display())
    })?;
    let mut bytes = Vec::with_capacity(size_hint(entry.size()));
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read {entry_name} from {}", archive_path.display()))?;
    Ok(bytes)
}

pub fn read_class_entries(archive_path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let (_file, mmap) = open_archive(archive_path)?;
    let mut archive = zip_reader(archive_path, &mmap)?;

    let mut classes = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().ends_with(CLASS_SUFFIX) {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(size_hint(entry.size()));
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {name} from {}", archive_path.display()))?;
        classes.push((name, bytes));
    }
    Ok(classes)
}

pub fn class_names(archive_path: &Path) -> Result<Vec<String>> {
    let (_file, mmap) = open_archive(archive_path)?;
    let mut archive = zip_reader(archive_path, &mmap)?;

    let mut classes = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if let Some(class_name) = entry.name().strip_suffix(CLASS_SUFFIX) {
            classes.push(class_name.replace('\\', "/"));
        }
    }
    Ok(classes)
}

pub fn read_manifest(archive_path: &Path) -> Result<Option<Manifest>> {
    let (_file, mmap) = open_archive(archive_path)?;
    let mut archive = zip_reader(archive_path, &mmap)?;
    let mut entry = match archive.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| {
                format!("Failed to open manifest of {}", archive_path.display())
            });
        }
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(Some(Manifest::parse(&String::from_utf8_lossy(&bytes))))
}
