use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use crate::entry::CLASS_SUFFIX;

pub const BOOT_JARS: [&str; 6] = [
    "rt.jar",
    "jce.jar",
    "jsse.jar",
    "charsets.jar",
    "resources.jar",
    "jfr.jar",
];

pub fn scan_jars(base_path: &Path) -> Result<Vec<PathBuf>> {
    let (tx, rx) = mpsc::channel();

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|e| e == "jar") {
                    let _ = tx.send(path.to_path_buf());
                }
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut jars: Vec<PathBuf> = rx.iter().collect();
    jars.sort();
    Ok(jars)
}

pub fn expand_classpath(elements: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut jars = Vec::new();
    for element in elements {
        if element.is_dir() {
            jars.extend(scan_jars(element)?);
        } else if element.is_file() {
            jars.push(element.clone());
        }
    }
    Ok(jars)
}

pub fn java_home_classpath(java_home: &Path) -> Vec<PathBuf> {
    let mut jars = Vec::new();
    for lib in [java_home.join("jre").join("lib"), java_home.join("lib")] {
        for name in BOOT_JARS {
            let jar = lib.join(name);
            if jar.is_file() {
                jars.push(jar);
            }
        }
    }
    jars
}

pub fn class_name_to_entry_path(class_name: &str) -> String {
    if class_name.ends_with(CLASS_SUFFIX) {
        return class_name.to_string();
    }
    format!("{}{CLASS_SUFFIX}", class_name.replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_path;
    use std::fs;

    #[test]
    fn scan_finds_nested_jars_in_order() -> Result<()> {
        let base = temp_path("scan");
        fs::create_dir_all(base.join("b/deep"))?;
        fs::create_dir_all(base.join("a"))?;
        fs::write(base.join("b/deep/z.jar"), b"")?;
        fs::write(base.join("a/y.jar"), b"")?;
        fs::write(base.join("a/notes.txt"), b"")?;

        let jars = scan_jars(&base)?;
        assert_eq!(jars, vec![base.join("a/y.jar"), base.join("b/deep/z.jar")]);

        let expanded = expand_classpath(&[base.join("a/y.jar"), base.join("b"), base.join("gone")])?;
        assert_eq!(expanded, vec![base.join("a/y.jar"), base.join("b/deep/z.jar")]);

        fs::remove_dir_all(base)?;
        Ok(())
    }

    #[test]
    fn java_home_prefers_existing_boot_jars() -> Result<()> {
        let home = temp_path("jdk");
        fs::create_dir_all(home.join("jre/lib"))?;
        fs::write(home.join("jre/lib/rt.jar"), b"")?;
        fs::write(home.join("jre/lib/jsse.jar"), b"")?;
        fs::write(home.join("jre/lib/tools.jar"), b"")?;

        assert_eq!(
            java_home_classpath(&home),
            vec![home.join("jre/lib/rt.jar"), home.join("jre/lib/jsse.jar")]
        );
        fs::remove_dir_all(home)?;
        Ok(())
    }

    #[test]
    fn class_names_map_to_entry_paths() {
        assert_eq!(class_name_to_entry_path("com.foo.Bar"), "com/foo/Bar.class");
        assert_eq!(class_name_to_entry_path("com/foo/Bar"), "com/foo/Bar.class");
        assert_eq!(class_name_to_entry_path("com/foo/Bar.class"), "com/foo/Bar.class");
    }
}
