use anyhow::Result;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::scan::{expand_classpath, java_home_classpath};

pub const SYSTEM_CLASSPATH_ENV: &str = "CLASS_DEPS_SYSTEM_CLASSPATH";
pub const LOG_ENV: &str = "CLASS_DEPS_LOG";

/// `--no-system` wins, then `--system-classpath`, then
/// `CLASS_DEPS_SYSTEM_CLASSPATH`, then the boot jars under `JAVA_HOME`.
pub fn resolve_system_classpath(cli: &Cli) -> Result<Vec<PathBuf>> {
    system_classpath_from(
        cli,
        env::var_os(SYSTEM_CLASSPATH_ENV),
        env::var_os("JAVA_HOME"),
    )
}

fn system_classpath_from(
    cli: &Cli,
    classpath_env: Option<OsString>,
    java_home: Option<OsString>,
) -> Result<Vec<PathBuf>> {
    if cli.no_system {
        return Ok(Vec::new());
    }

    if !cli.system_classpath.is_empty() {
        return expand_classpath(&cli.system_classpath);
    }

    if let Some(value) = classpath_env.filter(|v| !v.is_empty()) {
        let elements: Vec<PathBuf> = env::split_paths(&value).collect();
        return expand_classpath(&elements);
    }

    if let Some(home) = java_home.filter(|v| !v.is_empty()) {
        return Ok(java_home_classpath(&PathBuf::from(home)));
    }

    Ok(Vec::new())
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn init_logging(verbose: u8) {
    let filter = env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
