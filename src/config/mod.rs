//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by environment
//! variables (a `.env` file in the working directory is loaded first by the
//! binary).
//!
//! ```toml
//! threshold = 0.92
//!
//! [store]
//! backend = "sqlite"          # sqlite | redis | memory
//! sqlite_path = "/var/lib/tactic-dedupe/tactics.db"
//! redis_url = "localhost:6379"
//!
//! [logging]
//! format = "json"             # pretty | json
//! level = "info"
//! file = "/var/log/tactic-dedupe.log"
//! ```

use crate::services::deduplication::{DedupeConfig, validate_threshold};
use crate::storage::StoreResilienceConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory name under the platform config and data directories.
pub const APP_DIR: &str = "tactic-dedupe";

/// Main configuration for tactic-dedupe.
#[derive(Debug, Clone, Default)]
pub struct TacticConfig {
    /// Store backend selection.
    pub store: StoreConfig,
    /// Deduplication settings.
    pub dedupe: DedupeConfig,
    /// Logging settings from the config file; environment overrides are
    /// applied when logging is initialized.
    pub logging: LoggingSettings,
}

/// Store backend selection.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Which backend to use.
    pub backend: StoreBackendKind,
    /// Database file for the `SQLite` backend.
    pub sqlite_path: PathBuf,
    /// Server URL for the Redis backend.
    pub redis_url: Option<String>,
    /// Retry and circuit breaker settings.
    pub resilience: StoreResilienceConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            sqlite_path: default_sqlite_path(),
            redis_url: None,
            resilience: StoreResilienceConfig::default(),
        }
    }
}

/// Available store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// Local `SQLite` database.
    #[default]
    Sqlite,
    /// Redis server (feature `redis`).
    Redis,
    /// Process memory; nothing persists.
    Memory,
}

impl StoreBackendKind {
    /// Parses a backend name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "redis" => Some(Self::Redis),
            "memory" | "in-memory" | "inmemory" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Returns the backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Redis => "redis",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `tactic_dedupe=debug`.
    pub level: Option<String>,
    /// Log file path; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Similarity threshold.
    pub threshold: Option<f32>,
    /// Store section.
    pub store: Option<ConfigFileStore>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Store section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileStore {
    /// Backend name.
    pub backend: Option<StoreBackendKind>,
    /// `SQLite` database path.
    pub sqlite_path: Option<PathBuf>,
    /// Redis URL.
    pub redis_url: Option<String>,
}

impl TacticConfig {
    /// Loads configuration from `path` if given, else from the default
    /// location, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Loads configuration from a TOML file, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the file cannot be read or
    /// parsed, and [`Error::InvalidInput`] for an out-of-range threshold.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/tactic-dedupe/` on macOS)
    /// 2. XDG config dir (`~/.config/tactic-dedupe/`)
    ///
    /// Returns default configuration if no usable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join(APP_DIR).join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join(APP_DIR)
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                },
            }
        }

        Self::default()
    }

    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(threshold) = file.threshold {
            config.dedupe.threshold = validate_threshold(threshold)?;
        }
        if let Some(store) = file.store {
            if let Some(backend) = store.backend {
                config.store.backend = backend;
            }
            if let Some(path) = store.sqlite_path {
                config.store.sqlite_path = path;
            }
            config.store.redis_url = store
                .redis_url
                .as_deref()
                .and_then(normalize_redis_url);
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        Ok(config)
    }

    /// Applies environment variable overrides.
    ///
    /// | Variable | Overrides |
    /// |----------|-----------|
    /// | `TACTIC_STORE_BACKEND` | `store.backend` |
    /// | `TACTIC_SQLITE_PATH` | `store.sqlite_path` |
    /// | `REDIS_URL` | `store.redis_url` |
    /// | `TACTIC_DEDUP_THRESHOLD` | `dedupe.threshold` |
    /// | `TACTIC_STORE_RETRY_*`, `TACTIC_STORE_BREAKER_*` | `store.resilience` |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("TACTIC_STORE_BACKEND") {
            match StoreBackendKind::parse(&raw) {
                Some(backend) => self.store.backend = backend,
                None => tracing::warn!(value = %raw, "Ignoring unknown TACTIC_STORE_BACKEND"),
            }
        }
        if let Ok(path) = std::env::var("TACTIC_SQLITE_PATH") {
            if !path.trim().is_empty() {
                self.store.sqlite_path = PathBuf::from(path.trim());
            }
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            if let Some(url) = normalize_redis_url(&url) {
                self.store.redis_url = Some(url);
            }
        }
        self.dedupe = self.dedupe.with_env_overrides();
        self.store.resilience = self.store.resilience.with_env_overrides();
        self
    }

    /// Sets the similarity threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.dedupe.threshold = threshold;
        self
    }

    /// Sets the store backend.
    #[must_use]
    pub fn with_backend(mut self, backend: StoreBackendKind) -> Self {
        self.store.backend = backend;
        self
    }
}

/// Adds the `redis://` scheme to a bare `host:port`.
///
/// Returns `None` for a blank URL.
///
/// # Example
///
/// ```rust
/// use tactic_dedupe::config::normalize_redis_url;
///
/// assert_eq!(normalize_redis_url("localhost:6379").as_deref(), Some("redis://localhost:6379"));
/// assert_eq!(normalize_redis_url("rediss://cache:6380").as_deref(), Some("rediss://cache:6380"));
/// assert_eq!(normalize_redis_url("  "), None);
/// ```
#[must_use]
pub fn normalize_redis_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if ["redis://", "rediss://", "unix://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        Some(url.to_string())
    } else {
        Some(format!("redis://{url}"))
    }
}

/// Default `SQLite` database path: `<data dir>/tactic-dedupe/tactics.db`.
#[must_use]
pub fn default_sqlite_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("tactics.db"),
        |dirs| dirs.data_dir().join(APP_DIR).join("tactics.db"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = TacticConfig::default();
        assert_eq!(config.store.backend, StoreBackendKind::Sqlite);
        assert!(config.store.sqlite_path.ends_with("tactics.db"));
        assert!(config.store.redis_url.is_none());
        assert!((config.dedupe.threshold - 0.92).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
threshold = 0.9

[store]
backend = "redis"
redis_url = "cache:6379"

[logging]
format = "json"
"#,
        );
        let config = TacticConfig::load_from_file(file.path()).unwrap();
        assert!((config.dedupe.threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.store.backend, StoreBackendKind::Redis);
        assert_eq!(config.store.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_file_threshold_out_of_range() {
        let file = write_config("threshold = 1.5\n");
        assert!(matches!(
            TacticConfig::load_from_file(file.path()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let file = write_config("treshold = 0.9\n");
        assert!(matches!(
            TacticConfig::load_from_file(file.path()),
            Err(Error::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = TacticConfig::load_from_file(Path::new("/nonexistent/tactic.toml"));
        assert!(result.is_err());
    }

    #[test_case("sqlite", Some(StoreBackendKind::Sqlite))]
    #[test_case("REDIS", Some(StoreBackendKind::Redis))]
    #[test_case(" memory ", Some(StoreBackendKind::Memory))]
    #[test_case("postgres", None)]
    fn test_backend_parse(input: &str, expected: Option<StoreBackendKind>) {
        assert_eq!(StoreBackendKind::parse(input), expected);
    }

    #[test_case("localhost:6379", Some("redis://localhost:6379"))]
    #[test_case(" redis://h:1 ", Some("redis://h:1"))]
    #[test_case("unix:///tmp/redis.sock", Some("unix:///tmp/redis.sock"))]
    #[test_case("", None)]
    fn test_normalize_redis_url(input: &str, expected: Option<&str>) {
        assert_eq!(normalize_redis_url(input).as_deref(), expected);
    }

    #[test]
    fn test_builders() {
        let config = TacticConfig::default()
            .with_threshold(0.8)
            .with_backend(StoreBackendKind::Memory);
        assert_eq!(config.store.backend, StoreBackendKind::Memory);
        assert!((config.dedupe.threshold - 0.8).abs() < f32::EPSILON);
    }
}
