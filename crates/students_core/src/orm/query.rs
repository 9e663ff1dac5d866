//! Declarative entity queries.
//!
//! # Invariants
//! - Filters and orderings may only name mapped columns (or `rowid`).
//! - Filter values are always bound, never interpolated.

use super::entity::{column_list, Entity};
use super::session::Session;
use crate::repo::student_repo::{RepoError, RepoResult};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::marker::PhantomData;

/// SQLite insertion-order pseudo-column, usable as an ordering tie-break.
pub const ROWID: &str = "rowid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query over `E`, built from `Session::query`.
pub struct Query<'s, E: Entity> {
    session: &'s Session,
    filters: Vec<(&'static str, Value)>,
    ordering: Vec<(&'static str, Order)>,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity> Query<'s, E> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self {
            session,
            filters: Vec::new(),
            ordering: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Adds `column = value`; filters are joined with AND.
    pub fn filter_eq(mut self, column: &'static str, value: Value) -> Self {
        self.filters.push((column, value));
        self
    }

    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.ordering.push((column, order));
        self
    }

    /// All matching entities; each one is tracked by the session.
    pub fn list(self) -> RepoResult<Vec<E>> {
        self.fetch(None)
    }

    /// At most one matching entity; more than one match is invalid data.
    pub fn unique_result(self) -> RepoResult<Option<E>> {
        let mut matches = self.fetch(Some(2))?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(RepoError::InvalidData(format!(
                "expected a unique {} row, found several",
                E::TABLE
            ))),
        }
    }

    pub fn count(self) -> RepoResult<i64> {
        let where_clause = self.where_clause()?;
        let sql = format!("SELECT COUNT(*) FROM {}{where_clause};", E::TABLE);
        let binds = self.filters.into_iter().map(|(_, value)| value);
        let count = self
            .session
            .connection()
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count)
    }

    fn fetch(self, limit: Option<u32>) -> RepoResult<Vec<E>> {
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            column_list::<E>(),
            E::TABLE,
            self.where_clause()?
        );
        if !self.ordering.is_empty() {
            let mut terms = Vec::with_capacity(self.ordering.len());
            for (column, order) in &self.ordering {
                check_column::<E>(column)?;
                terms.push(format!("{column} {}", order.as_sql()));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql.push(';');

        let mut stmt = self.session.connection().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(
            self.filters.iter().map(|(_, value)| value),
        ))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let entity = E::load(row)?;
            self.session.track(&entity);
            entities.push(entity);
        }
        Ok(entities)
    }

    fn where_clause(&self) -> RepoResult<String> {
        if self.filters.is_empty() {
            return Ok(String::new());
        }
        let mut conditions = Vec::with_capacity(self.filters.len());
        for (index, (column, _)) in self.filters.iter().enumerate() {
            check_column::<E>(column)?;
            conditions.push(format!("{column} = ?{}", index + 1));
        }
        Ok(format!(" WHERE {}", conditions.join(" AND ")))
    }
}

fn check_column<E: Entity>(column: &str) -> RepoResult<()> {
    if column == ROWID || E::COLUMNS.contains(&column) {
        return Ok(());
    }
    Err(RepoError::InvalidData(format!(
        "unknown column `{column}` for table {}",
        E::TABLE
    )))
}
