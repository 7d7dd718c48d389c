use serde::Serialize;
use std::collections::HashMap;

use crate::entry::FileEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchFlags {
    pub name_match: bool,
    pub checksum_match: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub flags: Vec<MatchFlags>,
    pub name_matches: usize,
    pub checksum_matches: usize,
}

impl DuplicateReport {
    /// Raises the flags on `entries` and returns how many flags went from
    /// false to true. Flags are never cleared, so a second call returns 0.
    pub fn apply(&self, entries: &mut [FileEntry]) -> usize {
        let mut changed = 0;
        for (entry, flags) in entries.iter_mut().zip(&self.flags) {
            if flags.name_match && !entry.is_name_match {
                entry.is_name_match = true;
                changed += 1;
            }
            if flags.checksum_match && !entry.is_checksum_match {
                entry.is_checksum_match = true;
                changed += 1;
            }
        }
        changed
    }

    pub fn has_duplicates(&self) -> bool {
        self.name_matches > 0
    }
}

pub fn detect_duplicates(entries: &[FileEntry]) -> DuplicateReport {
    let mut by_path: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        by_path.entry(entry.full_path.as_str()).or_default().push(i);
    }

    let mut flags = vec![MatchFlags::default(); entries.len()];
    for indices in by_path.values().filter(|v| v.len() > 1) {
        for &i in indices {
            flags[i].name_match = true;
            let checksum = entries[i].checksum;
            flags[i].checksum_match = indices
                .iter()
                .any(|&j| j != i && entries[j].checksum == checksum);
        }
    }

    DuplicateReport {
        name_matches: flags.iter().filter(|f| f.name_match).count(),
        checksum_matches: flags.iter().filter(|f| f.checksum_match).count(),
        flags,
    }
}
