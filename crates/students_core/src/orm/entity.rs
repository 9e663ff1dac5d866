//! Entity mapping contract.
//!
//! # Invariants
//! - Column names are compile-time constants; only values are bound.
//! - The key column is store-generated and never part of `insert_values`.

use crate::repo::student_repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;
use uuid::Uuid;

/// Primary key type of every mapped entity.
pub type EntityKey = Uuid;

/// Maps a Rust type onto one table.
pub trait Entity: Sized {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    /// Columns read by `load`, key column included.
    const COLUMNS: &'static [&'static str];

    /// `None` until the store has assigned the key.
    fn key(&self) -> Option<EntityKey>;

    fn assign_key(&mut self, key: EntityKey);

    /// Caller-supplied columns for INSERT; store defaults fill the rest.
    fn insert_values(&self) -> Vec<(&'static str, Value)>;

    /// Columns compared against the loaded snapshot on flush.
    fn mutable_values(&self) -> Vec<(&'static str, Value)>;

    fn load(row: &Row<'_>) -> RepoResult<Self>;
}

pub(crate) fn key_to_sql(key: EntityKey) -> Value {
    Value::Text(key.to_string())
}

pub(crate) fn column_list<E: Entity>() -> String {
    E::COLUMNS.join(", ")
}

pub(crate) fn parse_key<E: Entity>(text: &str) -> RepoResult<EntityKey> {
    Uuid::parse_str(text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid key `{text}` in {}.{}",
            E::TABLE,
            E::KEY_COLUMN
        ))
    })
}
