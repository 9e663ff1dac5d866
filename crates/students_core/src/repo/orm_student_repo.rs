//! Session-based implementation of `StudentRepository`.
//!
//! # Responsibility
//! - Express student CRUD as entity queries and entity-graph operations.
//! - Scope every mutation in one session transaction.
//!
//! # Invariants
//! - Reads open one session and no transaction.
//! - Writes commit only after every write and the re-fetch succeeded;
//!   any failure rolls back before the error is returned.
//! - `save`/`update` flush then refresh so store-computed columns are current.

use crate::model::student::{Student, StudentId};
use crate::model::student_entity::StudentEntity;
use crate::orm::{Order, Session, SessionFactory, SessionTransaction, ROWID};
use crate::repo::student_repo::{RepoError, RepoResult, StudentRepository};
use log::{debug, error};
use rusqlite::types::Value;
use std::time::Instant;

/// Student repository over sessions from a `SessionFactory`.
#[derive(Debug, Clone, Copy)]
pub struct OrmStudentRepository<'f> {
    factory: &'f SessionFactory,
}

impl<'f> OrmStudentRepository<'f> {
    pub fn new(factory: &'f SessionFactory) -> Self {
        Self { factory }
    }

    fn read<T>(
        &self,
        op_name: &'static str,
        op: impl FnOnce(&Session) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = self
            .factory
            .open_session()
            .and_then(|session| op(&session));
        log_outcome(op_name, started_at, &result);
        result
    }

    // Session -> transaction -> {commit | rollback} -> session closed.
    // `Outcome::Rollback` discards the writes but still returns a value.
    fn write<T>(
        &self,
        op_name: &'static str,
        op: impl FnOnce(&Session) -> RepoResult<Outcome<T>>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = self.factory.open_session().and_then(|session| {
            let tx = session.begin_transaction()?;
            match op(&session) {
                Ok(Outcome::Commit(value)) => {
                    tx.commit()?;
                    Ok(value)
                }
                Ok(Outcome::Rollback(value)) => {
                    tx.rollback()?;
                    Ok(value)
                }
                Err(err) => {
                    rollback_after_failure(tx, op_name);
                    Err(err)
                }
            }
        });
        log_outcome(op_name, started_at, &result);
        result
    }
}

enum Outcome<T> {
    Commit(T),
    Rollback(T),
}

impl StudentRepository for OrmStudentRepository<'_> {
    fn find_all(&self) -> RepoResult<Vec<Student>> {
        self.read("find_all", |session| {
            session
                .query::<StudentEntity>()
                .order_by("created_at", Order::Desc)
                .order_by(ROWID, Order::Desc)
                .list()?
                .into_iter()
                .map(Student::try_from)
                .collect()
        })
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.read("find_by_id", |session| {
            session
                .get::<StudentEntity>(id)?
                .map(Student::try_from)
                .transpose()
        })
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.read("find_by_email", |session| {
            session
                .query::<StudentEntity>()
                .filter_eq("email", Value::Text(email.to_owned()))
                .unique_result()?
                .map(Student::try_from)
                .transpose()
        })
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        self.read("exists_by_email", |session| {
            let count = session
                .query::<StudentEntity>()
                .filter_eq("email", Value::Text(email.to_owned()))
                .count()?;
            Ok(count > 0)
        })
    }

    fn save(&self, full_name: &str, email: &str, age: Option<i32>) -> RepoResult<Student> {
        self.write("save", |session| {
            let mut student = StudentEntity::new(full_name, email, age);
            session
                .persist(&mut student)
                .map_err(|err| err.for_email(email))?;
            session.flush(&student)?;
            session.refresh(&mut student)?;
            Ok(Outcome::Commit(Student::try_from(student)?))
        })
    }

    fn update(&self, id: StudentId, full_name: &str, age: Option<i32>) -> RepoResult<Student> {
        self.write("update", |session| {
            let Some(mut student) = session.get::<StudentEntity>(id)? else {
                return Err(RepoError::NotFound(id));
            };
            student.set_full_name(full_name);
            student.set_age(age);
            session.flush(&student)?;
            session.refresh(&mut student)?;
            Ok(Outcome::Commit(Student::try_from(student)?))
        })
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool> {
        self.write("delete_by_id", |session| {
            let Some(student) = session.get::<StudentEntity>(id)? else {
                return Ok(Outcome::Rollback(false));
            };
            let removed = session.remove(&student)?;
            Ok(Outcome::Commit(removed))
        })
    }
}

fn rollback_after_failure(tx: SessionTransaction<'_>, op_name: &'static str) {
    // The operation error wins; a rollback error is only logged.
    if let Err(err) = tx.rollback() {
        error!(
            "event=tx_rollback module=repo engine=orm op={} status=error error={}",
            op_name, err
        );
    }
}

fn log_outcome<T>(op_name: &'static str, started_at: Instant, result: &RepoResult<T>) {
    match result {
        Ok(_) => debug!(
            "event=student_repo module=repo engine=orm op={} status=ok duration_ms={}",
            op_name,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=student_repo module=repo engine=orm op={} status=error duration_ms={} error_kind={:?} error={}",
            op_name,
            started_at.elapsed().as_millis(),
            err.kind(),
            err
        ),
    }
}
