//! Diagnostic logging setup.
//!
//! Console events go to stderr so they never interleave with progress output
//! on stdout. With `logging.save_logs` the same events are appended to the
//! configured log file.
use crate::config::LoggingSettings;
use crate::paths::Workspace;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub fn init(settings: &LoggingSettings, workspace: &Workspace) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(&settings.level)?);

    let file = if settings.save_logs {
        let path = workspace.resolve(&settings.log_file);
        let handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(handle))
                .with_filter(filter(&settings.level)?),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}

/// `RUST_LOG` when set, otherwise the configured level.
fn filter(level: &str) -> Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return EnvFilter::try_from_default_env().context("parse RUST_LOG");
    }
    let directive = level_directive(level);
    EnvFilter::try_new(directive).with_context(|| format!("invalid logging.level `{level}`"))
}

/// Map config level names onto tracing directives.
fn level_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_levels_map_to_directives() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive(" debug "), "debug");
    }
}
