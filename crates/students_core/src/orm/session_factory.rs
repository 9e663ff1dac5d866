//! Session factory lifecycle.
//!
//! # Responsibility
//! - Build once from a `ConnectionProvider` and verify the mapped schema.
//! - Open one `Session` per repository operation.
//! - Release the factory with an explicit `close` at shutdown.
//!
//! # Invariants
//! - After `close`, `open_session` fails with `DbError::SessionFactoryClosed`.
//! - `close` takes effect once; later calls are ignored.

use super::session::Session;
use crate::db::schema::{current_version, SCHEMA_VERSION};
use crate::db::{ConnectionProvider, DbError, DbResult};
use crate::repo::student_repo::RepoResult;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared producer of ORM sessions.
#[derive(Debug)]
pub struct SessionFactory {
    provider: ConnectionProvider,
    closed: AtomicBool,
    open_sessions: Arc<AtomicUsize>,
}

impl SessionFactory {
    /// Builds the factory, failing when the store schema is not the mapped one.
    pub fn build(provider: ConnectionProvider) -> DbResult<Self> {
        let started_at = Instant::now();
        info!("event=session_factory_build module=orm status=start");

        let conn = provider.get_connection()?;
        let version = current_version(&conn)?;
        drop(conn);
        if version != SCHEMA_VERSION {
            warn!(
                "event=session_factory_build module=orm status=error error_code=schema_mismatch db_version={version}"
            );
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: version,
                latest_supported: SCHEMA_VERSION,
            });
        }

        info!(
            "event=session_factory_build module=orm status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(Self {
            provider,
            closed: AtomicBool::new(false),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Opens a session owning a fresh connection.
    pub fn open_session(&self) -> RepoResult<Session> {
        if self.is_closed() {
            return Err(DbError::SessionFactoryClosed.into());
        }
        let conn = self.provider.get_connection()?;
        Ok(Session::new(conn, Arc::clone(&self.open_sessions)))
    }

    /// Shuts the factory down. Call once, during process shutdown.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!("event=session_factory_close module=orm status=skipped reason=already_closed");
            return;
        }
        let active = self.open_sessions();
        if active > 0 {
            warn!(
                "event=session_factory_close module=orm status=ok active_sessions={active}"
            );
        } else {
            info!("event=session_factory_close module=orm status=ok");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of sessions currently open from this factory.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}
