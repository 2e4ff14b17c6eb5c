//! Tracing subscriber setup.
//!
//! Console output is always on. When a log directory is configured, a second
//! layer writes plain-text logs to a daily-rolling file through a non-blocking
//! writer; the returned guard must be held until shutdown so buffered lines
//! are flushed.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "docshelf.log";

/// Filter for `level`, unless `RUST_LOG` is set.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Level to run at: `--verbose` forces debug.
pub fn effective_level(verbose: bool, configured: &str) -> String {
    if verbose {
        "debug".to_string()
    } else {
        configured.to_lowercase()
    }
}

/// Install the global subscriber.
pub fn init(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console = fmt::layer().with_target(false);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(build_filter(level))
            .with(console)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(console)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(true, "warn"), "debug");
        assert_eq!(effective_level(false, "WARN"), "warn");
        assert_eq!(effective_level(false, "info"), "info");
    }
}
