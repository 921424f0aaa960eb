//! Logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
    /// Append-only log file; stderr when `None`.
    pub file: Option<PathBuf>,
    /// Unrecognized format name that was replaced by the default.
    ///
    /// Reported as a warning once the subscriber is installed.
    pub ignored_format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: "info".to_string(),
            file: None,
            ignored_format: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from environment variables.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_settings(None, verbose)
    }

    /// Builds logging configuration from config file settings with env
    /// overrides.
    ///
    /// The filter is `debug` with `verbose`, otherwise the first of
    /// `RUST_LOG`, `TACTIC_LOG_LEVEL`, the file's `level`, and `info`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let raw_format =
            env_non_empty("TACTIC_LOG_FORMAT").or_else(|| settings.and_then(|s| s.format.clone()));
        let (format, ignored_format) = match raw_format {
            Some(raw) => match LogFormat::parse(&raw) {
                Some(format) => (format, None),
                None => (LogFormat::default(), Some(raw)),
            },
            None => (LogFormat::default(), None),
        };

        let filter = if verbose {
            "debug".to_string()
        } else {
            env_non_empty("RUST_LOG")
                .or_else(|| env_non_empty("TACTIC_LOG_LEVEL"))
                .or_else(|| settings.and_then(|s| s.level.clone()))
                .unwrap_or_else(|| "info".to_string())
        };

        let file = env_non_empty("TACTIC_LOG_FILE")
            .map(PathBuf::from)
            .or_else(|| settings.and_then(|s| s.file.clone()));

        Self {
            format,
            filter,
            file,
            ignored_format,
        }
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
