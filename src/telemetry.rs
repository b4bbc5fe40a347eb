//! Tracing subscriber setup.
//!
//! Log lines go through [`SanitizingMakeWriter`] before reaching the sink,
//! so patient identifiers never land in a log file.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::sanitize::SanitizingMakeWriter;
use crate::{CardiolensError, Result};

const DEFAULT_LOG_FILE: &str = "cardiolens.log";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub sink: LogSink,

    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sink: LogSink::Stdout,
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - CARDIOLENS_LOG_MODE: `stdout` (default) or `file`
    /// - CARDIOLENS_LOG_FILE: path used in file mode
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let mode = lookup("CARDIOLENS_LOG_MODE").unwrap_or_default();
        if mode.trim().eq_ignore_ascii_case("file") {
            let path = lookup("CARDIOLENS_LOG_FILE")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
            cfg.sink = LogSink::File(PathBuf::from(path));
        }

        cfg
    }
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes and stops the background writer.
///
/// # Errors
/// Returns error if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> Result<WorkerGuard> {
    let (writer, guard) = match &config.sink {
        LogSink::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogSink::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                // Best-effort: the open below reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_appender::non_blocking(file)
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .try_init()
        .map_err(|e| CardiolensError::Config(format!("logging already initialised: {e}")))?;

    tracing::info!(sink = ?config.sink, "logging initialised");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stdout() {
        let cfg = LogConfig::from_lookup(|_| None);
        assert_eq!(cfg.sink, LogSink::Stdout);
        assert_eq!(cfg.default_filter, "info");
    }

    #[test]
    fn test_file_mode() {
        let cfg = LogConfig::from_lookup(|key| match key {
            "CARDIOLENS_LOG_MODE" => Some("FILE".to_string()),
            "CARDIOLENS_LOG_FILE" => Some("/tmp/cardiolens/app.log".to_string()),
            _ => None,
        });
        assert_eq!(cfg.sink, LogSink::File(PathBuf::from("/tmp/cardiolens/app.log")));
    }

    #[test]
    fn test_file_mode_default_path() {
        let cfg = LogConfig::from_lookup(|key| (key == "CARDIOLENS_LOG_MODE").then(|| "file".to_string()));
        assert_eq!(cfg.sink, LogSink::File(PathBuf::from(DEFAULT_LOG_FILE)));
    }
}
