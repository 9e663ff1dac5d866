//! Per-call connection provisioning for SQLite.
//!
//! # Responsibility
//! - Validate static database settings once, at construction.
//! - Open a new, independently owned connection for every call.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and the configured busy timeout.
//! - The schema is applied before the first connection is handed out.
//! - No connection is cached or shared between calls.
//! - Only the bootstrap connection may create the database file.

use super::schema::ensure_schema;
use super::{DbError, DbResult};
use crate::config::DbSettings;
use log::{debug, error, info};
use rusqlite::{Connection, OpenFlags};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide factory of raw database connections.
///
/// Cloning is cheap and shares the same immutable settings.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    settings: Arc<DbSettings>,
}

impl ConnectionProvider {
    /// Validates `settings`, bootstraps the schema and returns a ready provider.
    ///
    /// # Errors
    /// - `DbError::Config` when the driver or address is unusable.
    /// - `DbError::Connect` when the store cannot be opened.
    /// - `DbError::UnsupportedSchemaVersion` for databases from a newer binary.
    pub fn new(settings: DbSettings) -> DbResult<Self> {
        let started_at = Instant::now();
        info!(
            "event=db_provider_init module=db status=start driver={}",
            settings.driver
        );

        if let Err(err) = settings.validate() {
            error!(
                "event=db_provider_init module=db status=error error_code=invalid_settings error={}",
                err
            );
            return Err(err);
        }

        let provider = Self {
            settings: Arc::new(settings),
        };

        let outcome = provider
            .open(OpenFlags::default())
            .and_then(|mut conn| ensure_schema(&mut conn));
        match outcome {
            Ok(()) => {
                info!(
                    "event=db_provider_init module=db status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(provider)
            }
            Err(err) => {
                error!(
                    "event=db_provider_init module=db status=error duration_ms={} error_code=db_bootstrap_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Opens a fresh connection owned exclusively by the caller.
    ///
    /// Dropping the returned connection releases it. A store file that has
    /// gone away is reported as `DbError::Connect`, never recreated.
    pub fn get_connection(&self) -> DbResult<Connection> {
        self.open(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Returns the settings this provider was built from.
    pub fn settings(&self) -> &DbSettings {
        &self.settings
    }

    fn open(&self, flags: OpenFlags) -> DbResult<Connection> {
        let url = self.settings.url.as_str();
        let conn = Connection::open_with_flags(url, flags)
            .and_then(|conn| {
                configure_connection(&conn, &self.settings)?;
                Ok(conn)
            })
            .map_err(|source| {
                error!(
                    "event=db_connect module=db status=error error_code=db_connect_failed error={}",
                    source
                );
                DbError::Connect {
                    url: url.to_string(),
                    source,
                }
            })?;

        debug!("event=db_connect module=db status=ok");
        Ok(conn)
    }
}

fn configure_connection(conn: &Connection, settings: &DbSettings) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(settings.busy_timeout())?;
    Ok(())
}
