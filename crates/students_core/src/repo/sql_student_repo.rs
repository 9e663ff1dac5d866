//! Hand-written SQL implementation of `StudentRepository`.
//!
//! # Responsibility
//! - Issue explicit parameterized statements against `students`.
//! - Map result rows to `Student`.
//!
//! # Invariants
//! - One connection and one prepared statement per call, dropped on every path.
//! - `save`/`update` mutate and read back in a single `RETURNING` statement.
//! - `email` is never part of an UPDATE.

use crate::db::ConnectionProvider;
use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::{parse_student_id, RepoError, RepoResult, StudentRepository};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::Instant;

const STUDENT_COLUMNS: &str = "id, full_name, email, age, created_at";

/// Student repository over raw connections from a `ConnectionProvider`.
#[derive(Debug, Clone)]
pub struct SqlStudentRepository {
    provider: ConnectionProvider,
}

impl SqlStudentRepository {
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }

    // Scopes one connection to `op`; the connection drops before the result
    // is returned, whatever the outcome.
    fn with_connection<T>(
        &self,
        op_name: &'static str,
        op: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = self
            .provider
            .get_connection()
            .map_err(RepoError::from)
            .and_then(|conn| op(&conn));

        match &result {
            Ok(_) => debug!(
                "event=student_repo module=repo engine=sql op={} status=ok duration_ms={}",
                op_name,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=student_repo module=repo engine=sql op={} status=error duration_ms={} error_kind={:?} error={}",
                op_name,
                started_at.elapsed().as_millis(),
                err.kind(),
                err
            ),
        }
        result
    }
}

impl StudentRepository for SqlStudentRepository {
    fn find_all(&self) -> RepoResult<Vec<Student>> {
        self.with_connection("find_all", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLUMNS}
                 FROM students
                 ORDER BY created_at DESC, rowid DESC;"
            ))?;
            let mut rows = stmt.query([])?;
            let mut students = Vec::new();
            while let Some(row) = rows.next()? {
                students.push(parse_student_row(row)?);
            }
            Ok(students)
        })
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.with_connection("find_by_id", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1;"
            ))?;
            let mut rows = stmt.query([id.to_string()])?;
            match rows.next()? {
                Some(row) => Ok(Some(parse_student_row(row)?)),
                None => Ok(None),
            }
        })
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.with_connection("find_by_email", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students WHERE email = ?1;"
            ))?;
            let mut rows = stmt.query([email])?;
            match rows.next()? {
                Some(row) => Ok(Some(parse_student_row(row)?)),
                None => Ok(None),
            }
        })
    }

    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        self.with_connection("exists_by_email", |conn| {
            let mut stmt = conn.prepare("SELECT 1 FROM students WHERE email = ?1 LIMIT 1;")?;
            Ok(stmt.exists([email])?)
        })
    }

    fn save(&self, full_name: &str, email: &str, age: Option<i32>) -> RepoResult<Student> {
        self.with_connection("save", |conn| {
            let mut stmt = conn.prepare(&format!(
                "INSERT INTO students (full_name, email, age)
                 VALUES (?1, ?2, ?3)
                 RETURNING {STUDENT_COLUMNS};"
            ))?;
            stmt.query_row(params![full_name, email, age], |row| {
                Ok(parse_student_row(row))
            })
            .map_err(|err| RepoError::from(err).for_email(email))?
        })
    }

    fn update(&self, id: StudentId, full_name: &str, age: Option<i32>) -> RepoResult<Student> {
        self.with_connection("update", |conn| {
            let mut stmt = conn.prepare(&format!(
                "UPDATE students
                 SET full_name = ?1, age = ?2
                 WHERE id = ?3
                 RETURNING {STUDENT_COLUMNS};"
            ))?;
            let updated = stmt
                .query_row(params![full_name, age, id.to_string()], |row| {
                    Ok(parse_student_row(row))
                })
                .optional()?;
            match updated {
                Some(student) => student,
                None => Err(RepoError::NotFound(id)),
            }
        })
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool> {
        self.with_connection("delete_by_id", |conn| {
            let mut stmt = conn.prepare("DELETE FROM students WHERE id = ?1;")?;
            let changed = stmt.execute([id.to_string()])?;
            Ok(changed > 0)
        })
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("id")?;
    Ok(Student {
        id: parse_student_id(&id_text)?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        age: row.get("age")?,
        created_at: row.get("created_at")?,
    })
}
