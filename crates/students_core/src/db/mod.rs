//! Relational store bootstrap and connection provisioning.
//!
//! # Responsibility
//! - Hand out one fresh SQLite connection per repository call.
//! - Apply the `students` schema before any connection is handed out.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Settings are validated once, when the provider is built.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod provider;
pub mod schema;

pub use provider::ConnectionProvider;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Statement, transaction or row-decoding failure reported by SQLite.
    Sqlite(rusqlite::Error),
    /// The store could not be opened at the configured address.
    Connect {
        url: String,
        source: rusqlite::Error,
    },
    /// Static settings are unusable (unknown driver, empty address, ...).
    Config(String),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A session was requested after the session factory was closed.
    SessionFactoryClosed,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Connect { url, source } => {
                write!(f, "cannot connect to database `{url}`: {source}")
            }
            Self::Config(message) => write!(f, "invalid database settings: {message}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SessionFactoryClosed => write!(f, "session factory is closed"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Connect { source, .. } => Some(source),
            Self::Config(_) | Self::UnsupportedSchemaVersion { .. } | Self::SessionFactoryClosed => {
                None
            }
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl DbError {
    /// Returns whether this error means the store could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::SessionFactoryClosed)
    }
}
