//! `students` schema bootstrap.
//!
//! # Responsibility
//! - Create the `students` table on an empty database.
//! - Refuse to open databases written by a newer binary.
//!
//! # Invariants
//! - Applied version is mirrored to `PRAGMA user_version`.
//! - `id` and `created_at` are produced by column defaults, never by callers.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// Current schema version understood by this binary.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = include_str!("0001_students.sql");

/// Returns the schema version recorded in the database file.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Creates the schema when missing, atomically.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let version = current_version(conn)?;

    if version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: SCHEMA_VERSION,
        });
    }

    if version == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;

    Ok(())
}
