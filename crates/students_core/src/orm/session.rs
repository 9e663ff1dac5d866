//! Unit-of-work session over one owned connection.
//!
//! # Responsibility
//! - Load, persist, flush, refresh and remove mapped entities.
//! - Track loaded column snapshots so `flush` writes only dirty columns.
//!
//! # Invariants
//! - A session owns exactly one connection and is never shared across calls.
//! - Snapshots are discarded whenever the enclosing transaction rolls back.
//! - Dropping the session closes its connection.

use super::entity::{column_list, key_to_sql, parse_key, Entity, EntityKey};
use super::query::Query;
use super::transaction::SessionTransaction;
use crate::repo::student_repo::{RepoError, RepoResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

type SnapshotKey = (&'static str, EntityKey);
type Snapshot = Vec<(&'static str, Value)>;

/// ORM session; open one per operation via `SessionFactory::open_session`.
pub struct Session {
    conn: Connection,
    snapshots: RefCell<HashMap<SnapshotKey, Snapshot>>,
    open_sessions: Arc<AtomicUsize>,
    opened_at: Instant,
}

impl Session {
    pub(crate) fn new(conn: Connection, open_sessions: Arc<AtomicUsize>) -> Self {
        let active = open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("event=session_open module=orm status=ok active_sessions={active}");
        Self {
            conn,
            snapshots: RefCell::new(HashMap::new()),
            open_sessions,
            opened_at: Instant::now(),
        }
    }

    /// Opens an IMMEDIATE transaction; it rolls back unless committed.
    pub fn begin_transaction(&self) -> RepoResult<SessionTransaction<'_>> {
        SessionTransaction::begin(self)
    }

    /// Loads one entity by primary key and starts tracking it.
    pub fn get<E: Entity>(&self, key: EntityKey) -> RepoResult<Option<E>> {
        let entity = self.select_by_key::<E>(key)?;
        if let Some(entity) = &entity {
            self.track(entity);
        }
        Ok(entity)
    }

    /// Starts a declarative query over `E`.
    pub fn query<E: Entity>(&self) -> Query<'_, E> {
        Query::new(self)
    }

    /// Inserts a new entity and assigns the store-generated key to it.
    ///
    /// Store-defaulted columns other than the key stay unset until `refresh`.
    pub fn persist<E: Entity>(&self, entity: &mut E) -> RepoResult<EntityKey> {
        if let Some(key) = entity.key() {
            return Err(RepoError::InvalidData(format!(
                "cannot persist {} row {key}: entity already has a key",
                E::TABLE
            )));
        }

        let values = entity.insert_values();
        let columns = values
            .iter()
            .map(|(column, _)| *column)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=values.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders}) RETURNING {};",
            E::TABLE,
            E::KEY_COLUMN
        );

        let key_text: String = self.conn.query_row(
            &sql,
            params_from_iter(values.into_iter().map(|(_, value)| value)),
            |row| row.get(0),
        )?;
        let key = parse_key::<E>(&key_text)?;
        entity.assign_key(key);
        self.track(entity);
        Ok(key)
    }

    /// Writes columns changed since the entity was loaded.
    ///
    /// Returns `false` when nothing was dirty.
    pub fn flush<E: Entity>(&self, entity: &E) -> RepoResult<bool> {
        let key = managed_key(entity)?;
        let snapshot = self
            .snapshots
            .borrow()
            .get(&(E::TABLE, key))
            .cloned()
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "cannot flush {} row {key}: entity is not managed by this session",
                    E::TABLE
                ))
            })?;

        let current = entity.mutable_values();
        let dirty = current
            .iter()
            .filter(|(column, value)| {
                snapshot
                    .iter()
                    .find(|(tracked, _)| tracked == column)
                    .map_or(true, |(_, loaded)| loaded != value)
            })
            .cloned()
            .collect::<Vec<_>>();

        if dirty.is_empty() {
            debug!("event=session_flush module=orm status=clean table={}", E::TABLE);
            return Ok(false);
        }

        let assignments = dirty
            .iter()
            .enumerate()
            .map(|(index, (column, _))| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?{};",
            E::TABLE,
            E::KEY_COLUMN,
            dirty.len() + 1
        );
        let dirty_columns = dirty.len();
        let mut binds = dirty.into_iter().map(|(_, value)| value).collect::<Vec<_>>();
        binds.push(key_to_sql(key));

        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        if changed == 0 {
            self.forget::<E>(key);
            return Err(RepoError::NotFound(key));
        }

        self.snapshots
            .borrow_mut()
            .insert((E::TABLE, key), current);
        debug!(
            "event=session_flush module=orm status=ok table={} dirty_columns={dirty_columns}",
            E::TABLE
        );
        Ok(true)
    }

    /// Re-reads every column of `entity` from the store.
    pub fn refresh<E: Entity>(&self, entity: &mut E) -> RepoResult<()> {
        let key = managed_key(entity)?;
        match self.select_by_key::<E>(key)? {
            Some(fresh) => {
                self.track(&fresh);
                *entity = fresh;
                Ok(())
            }
            None => {
                self.forget::<E>(key);
                Err(RepoError::NotFound(key))
            }
        }
    }

    /// Deletes the entity's row; `true` iff a row was removed.
    pub fn remove<E: Entity>(&self, entity: &E) -> RepoResult<bool> {
        let key = managed_key(entity)?;
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1;", E::TABLE, E::KEY_COLUMN),
            [key_to_sql(key)],
        )?;
        self.forget::<E>(key);
        Ok(changed > 0)
    }

    /// Whether the session currently tracks a snapshot for `entity`.
    pub fn contains<E: Entity>(&self, entity: &E) -> bool {
        entity
            .key()
            .is_some_and(|key| self.snapshots.borrow().contains_key(&(E::TABLE, key)))
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn track<E: Entity>(&self, entity: &E) {
        if let Some(key) = entity.key() {
            self.snapshots
                .borrow_mut()
                .insert((E::TABLE, key), entity.mutable_values());
        }
    }

    pub(crate) fn clear(&self) {
        self.snapshots.borrow_mut().clear();
    }

    fn forget<E: Entity>(&self, key: EntityKey) {
        self.snapshots.borrow_mut().remove(&(E::TABLE, key));
    }

    fn select_by_key<E: Entity>(&self, key: EntityKey) -> RepoResult<Option<E>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            column_list::<E>(),
            E::TABLE,
            E::KEY_COLUMN
        ))?;
        let mut rows = stmt.query([key_to_sql(key)])?;
        match rows.next()? {
            Some(row) => Ok(Some(E::load(row)?)),
            None => Ok(None),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let active = self.open_sessions.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(
            "event=session_close module=orm status=ok duration_ms={} active_sessions={active}",
            self.opened_at.elapsed().as_millis()
        );
    }
}

fn managed_key<E: Entity>(entity: &E) -> RepoResult<EntityKey> {
    entity.key().ok_or_else(|| {
        RepoError::InvalidData(format!(
            "{} entity has no key; persist it first",
            E::TABLE
        ))
    })
}
