//! `tracing` subscriber setup.
//!
//! Level precedence: `--verbose`, then `RUST_LOG`, then `logLevel` from the
//! settings file. Output goes to stderr (stdout carries command results)
//! unless `logDir` is set, in which case a daily rolling file is used.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

const LOG_FILE_PREFIX: &str = "sceau.log";

/// Keeps the file writer flushing; hold it until the process exits.
#[must_use = "dropping the guard stops log file output"]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Resolve the filter directive from the flag, the environment, and settings.
#[must_use]
pub fn filter_directive(verbose: bool, env: Option<&str>, settings: &Settings) -> String {
    if verbose {
        return "debug".into();
    }
    match env {
        Some(directive) if !directive.trim().is_empty() => directive.to_owned(),
        _ => settings.log_level.to_ascii_lowercase(),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an unparsable filter, an unusable log directory, or when a
/// subscriber is already installed.
pub fn init(verbose: bool, settings: &Settings) -> anyhow::Result<LogGuard> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(verbose, env.as_deref(), settings);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter {directive:?}"))?;

    match settings.log_dir.as_deref() {
        Some(dir) => init_file(filter, dir),
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
            Ok(LogGuard { _worker: None })
        }
    }
}

fn init_file(filter: EnvFilter, dir: &Path) -> anyhow::Result<LogGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    Ok(LogGuard {
        _worker: Some(guard),
    })
}
