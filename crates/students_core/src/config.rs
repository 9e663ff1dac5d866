//! Static application settings.
//!
//! # Responsibility
//! - Load database and logging settings from a TOML file once at startup.
//! - Apply `STUDENTS_*` environment overrides on top of the file.
//!
//! # Invariants
//! - Only the `sqlite` driver is registered.
//! - Settings are immutable after the provider is built from them.

use crate::db::{DbError, DbResult};
use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SQLITE_DRIVER: &str = "sqlite";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub const ENV_DB_URL: &str = "STUDENTS_DB_URL";
pub const ENV_LOG_LEVEL: &str = "STUDENTS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STUDENTS_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub database: DbSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Store address and driver identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbSettings {
    #[serde(default = "default_driver")]
    pub driver: String,
    /// SQLite database file path (or `file:` URI).
    pub url: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    /// Absolute directory for rolling log files. `None` disables file logging.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// Reads and parses a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses TOML settings text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Overrides file values with `STUDENTS_*` environment variables when set.
    pub fn apply_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_DB_URL) {
            self.database.url = url;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.logging.dir = Some(PathBuf::from(dir));
        }
    }
}

impl DbSettings {
    /// Settings for a SQLite file with default timeouts.
    pub fn sqlite(url: impl Into<String>) -> Self {
        Self {
            driver: default_driver(),
            url: url.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Checks driver registration and address shape.
    pub fn validate(&self) -> DbResult<()> {
        if !self.driver.eq_ignore_ascii_case(SQLITE_DRIVER) {
            return Err(DbError::Config(format!(
                "unsupported driver `{}`; expected `{SQLITE_DRIVER}`",
                self.driver
            )));
        }
        if self.url.trim().is_empty() {
            return Err(DbError::Config("database url cannot be empty".to_string()));
        }
        if self.busy_timeout_ms == 0 {
            return Err(DbError::Config(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_driver() -> String {
    SQLITE_DRIVER.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_level() -> String {
    default_log_level().to_string()
}
