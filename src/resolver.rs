use std::collections::{BTreeSet, HashSet};

use crate::entry::FileEntry;

pub trait ClassLookup {
    fn contains_class(&self, name: &str) -> bool;
}

impl ClassLookup for HashSet<String> {
    fn contains_class(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl ClassLookup for BTreeSet<String> {
    fn contains_class(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// `refs - (provided ∪ system ∪ {self_name})`.
pub fn missing<I, S>(
    refs: I,
    provided: &dyn ClassLookup,
    system: &dyn ClassLookup,
    self_name: Option<&str>,
) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    refs.into_iter()
        .filter(|r| {
            let name = r.as_ref();
            Some(name) != self_name
                && !provided.contains_class(name)
                && !system.contains_class(name)
        })
        .map(|r| r.as_ref().to_string())
        .collect()
}

pub fn included<I, S>(refs: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    refs.into_iter().map(|r| r.as_ref().to_string()).collect()
}

pub fn provided_classes<'a, I>(entries: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a FileEntry>,
{
    entries.into_iter().filter_map(FileEntry::class_name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_is_refs_minus_provided_system_and_self() {
        let refs = ["a/A", "b/B", "java/lang/String", "own/Self", "c/C", "b/B"];
        let provided = set(&["a/A"]);
        let system = set(&["java/lang/String"]);
        let result = missing(refs, &provided, &system, Some("own/Self"));
        assert_eq!(
            result.into_iter().collect::<Vec<_>>(),
            vec!["b/B".to_string(), "c/C".to_string()]
        );
    }

    #[test]
    fn missing_without_self_name_keeps_everything_unprovided() {
        let refs = vec!["x/X".to_string()];
        let empty: BTreeSet<String> = BTreeSet::new();
        let result = missing(&refs, &empty, &empty, None);
        assert!(result.contains("x/X"));
    }

    #[test]
    fn empty_refs_yield_empty_missing() {
        let provided = set(&["a/A"]);
        let system = set(&["java/lang/Object"]);
        let refs: [&str; 0] = [];
        assert!(missing(refs, &provided, &system, Some("a/A")).is_empty());
    }

    #[test]
    fn included_is_distinct_refs() {
        let result = included(["b/B", "a/A", "b/B"]);
        assert_eq!(result.len(), 2);
        assert!(result.contains("a/A") && result.contains("b/B"));
    }

    #[test]
    fn provided_set_uses_class_entries_only() {
        let entries = vec![
            FileEntry::from_archive_entry("app.jar", "com/foo/Bar.class", 1, 10, 0),
            FileEntry::from_archive_entry("app.jar", "com/foo/Bar$1.class", 2, 10, 0),
            FileEntry::from_archive_entry("app.jar", "META-INF/MANIFEST.MF", 3, 10, 0),
        ];
        let provided = provided_classes(&entries);
        assert_eq!(provided, set(&["com/foo/Bar", "com/foo/Bar$1"]));
    }
}
