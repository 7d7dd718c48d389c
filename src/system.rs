use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{info, warn};

use crate::archive;
use crate::resolver::ClassLookup;

#[derive(Debug, Clone, Default)]
pub struct SystemClasses {
    names: HashSet<String>,
    archives: Vec<PathBuf>,
    failures: Vec<SystemArchiveFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemArchiveFailure {
    pub archive: String,
    pub error: String,
}

impl SystemClasses {
    pub fn load(archives: &[PathBuf]) -> Self {
        let start = Instant::now();
        let results: Vec<(&PathBuf, anyhow::Result<Vec<String>>)> = archives
            .par_iter()
            .map(|jar| (jar, archive::class_names(jar)))
            .collect();

        let mut classes = Self::default();
        for (jar, result) in results {
            match result {
                Ok(names) => {
                    classes.names.extend(names);
                    classes.archives.push(jar.clone());
                }
                Err(err) => {
                    warn!(archive = %jar.display(), error = %err, "skipping unreadable system archive");
                    classes.failures.push(SystemArchiveFailure {
                        archive: jar.to_string_lossy().to_string(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }

        info!(
            archives = classes.archives.len(),
            classes = classes.names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded system classes"
        );
        classes
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn archives(&self) -> &[PathBuf] {
        &self.archives
    }

    pub fn failures(&self) -> &[SystemArchiveFailure] {
        &self.failures
    }
}

impl ClassLookup for SystemClasses {
    fn contains_class(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Loads the class set for its classpath on first use.
#[derive(Debug, Default)]
pub struct SystemClassCache {
    classpath: Vec<PathBuf>,
    classes: OnceLock<SystemClasses>,
}

impl SystemClassCache {
    pub fn new(classpath: Vec<PathBuf>) -> Self {
        Self {
            classpath,
            classes: OnceLock::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }

    pub fn is_loaded(&self) -> bool {
        self.classes.get().is_some()
    }

    pub fn get(&self) -> &SystemClasses {
        self.classes.get_or_init(|| SystemClasses::load(&self.classpath))
    }
}
