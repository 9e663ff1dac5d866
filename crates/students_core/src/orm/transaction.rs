//! Session-scoped transaction guard.
//!
//! # Invariants
//! - `commit` and `rollback` consume the guard; each runs at most once.
//! - A guard dropped without `commit` rolls back and clears session snapshots.

use super::session::Session;
use crate::repo::student_repo::RepoResult;
use log::{debug, error, warn};
use rusqlite::{Transaction, TransactionBehavior};
use std::time::Instant;

/// Explicit transaction on a `Session`.
pub struct SessionTransaction<'s> {
    session: &'s Session,
    tx: Option<Transaction<'s>>,
    started_at: Instant,
}

impl<'s> SessionTransaction<'s> {
    pub(crate) fn begin(session: &'s Session) -> RepoResult<Self> {
        let tx = Transaction::new_unchecked(session.connection(), TransactionBehavior::Immediate)?;
        debug!("event=tx_begin module=orm status=ok");
        Ok(Self {
            session,
            tx: Some(tx),
            started_at: Instant::now(),
        })
    }

    pub fn commit(mut self) -> RepoResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        match tx.commit() {
            Ok(()) => {
                debug!(
                    "event=tx_commit module=orm status=ok duration_ms={}",
                    self.started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                // rusqlite rolls the transaction back when COMMIT fails.
                self.session.clear();
                error!(
                    "event=tx_commit module=orm status=error duration_ms={} error={}",
                    self.started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    pub fn rollback(mut self) -> RepoResult<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        self.session.clear();
        tx.rollback()?;
        debug!(
            "event=tx_rollback module=orm status=ok duration_ms={}",
            self.started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

impl Drop for SessionTransaction<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            self.session.clear();
            warn!("event=tx_rollback module=orm status=ok reason=dropped_uncommitted");
            drop(tx);
        }
    }
}
