//! Student repository contract shared by the SQL and ORM engines.
//!
//! # Responsibility
//! - Define the CRUD capability both engines implement.
//! - Classify store failures into the error kinds callers can act on.
//!
//! # Invariants
//! - Both engines return identical results and error kinds for the same calls.
//! - A UNIQUE violation reported by the store is always `ConstraintViolation`.
//! - No operation retries; failures surface after resources are released.

use crate::db::DbError;
use crate::model::student::{Student, StudentId};
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Failure of a repository call.
#[derive(Debug)]
pub enum RepoError {
    /// The store cannot be reached, opened or is shut down.
    Connectivity(DbError),
    /// A write would break email uniqueness.
    ConstraintViolation(String),
    /// No student exists for the identifier.
    NotFound(StudentId),
    /// Any other store failure (statement, commit, dropped connection).
    Infrastructure(DbError),
    /// A stored row cannot be mapped to a valid `Student`.
    InvalidData(String),
}

/// Caller-facing classification of `RepoError`.
///
/// A boundary layer maps these to status codes: `NotFound` to 404,
/// `ConstraintViolation` to 400, the rest to 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connectivity,
    ConstraintViolation,
    NotFound,
    Infrastructure,
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Infrastructure(_) | Self::InvalidData(_) => ErrorKind::Infrastructure,
        }
    }

    /// Constraint violation for an email that is already taken.
    pub fn duplicate_email(email: &str) -> Self {
        Self::ConstraintViolation(format!("email already exists: {email}"))
    }

    /// Rewrites a generic uniqueness violation into the email-specific one.
    pub(crate) fn for_email(self, email: &str) -> Self {
        match self {
            Self::ConstraintViolation(_) => Self::duplicate_email(email),
            other => other,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connectivity(err) => write!(f, "database unavailable: {err}"),
            Self::ConstraintViolation(message) => write!(f, "{message}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::Infrastructure(err) => write!(f, "database error: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connectivity(err) | Self::Infrastructure(err) => Some(err),
            Self::ConstraintViolation(_) | Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other if other.is_connectivity() => Self::Connectivity(other),
            other => Self::Infrastructure(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if is_unique_violation(&value) {
            let message = match &value {
                rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
                other => other.to_string(),
            };
            return Self::ConstraintViolation(message);
        }
        Self::Infrastructure(DbError::Sqlite(value))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

/// Parses a TEXT identifier column into a `StudentId`.
pub(crate) fn parse_student_id(text: &str) -> RepoResult<StudentId> {
    Uuid::parse_str(text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in students.id")))
}

/// CRUD capability over stored students.
///
/// Each call acquires its own store resource and releases it before
/// returning, on success and failure alike.
pub trait StudentRepository {
    /// All students, newest `created_at` first.
    fn find_all(&self) -> RepoResult<Vec<Student>>;
    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// At most one student, relying on email uniqueness.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>>;
    fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    /// Inserts a student; the store assigns `id` and `created_at`.
    fn save(&self, full_name: &str, email: &str, age: Option<i32>) -> RepoResult<Student>;
    /// Replaces `full_name` and `age`; fails with `NotFound` for unknown ids.
    fn update(&self, id: StudentId, full_name: &str, age: Option<i32>) -> RepoResult<Student>;
    /// Hard-deletes by id; `true` iff a row was removed.
    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool>;
}

macro_rules! forward_student_repository {
    ($($wrapper:ty),+) => {$(
        impl<R: StudentRepository + ?Sized> StudentRepository for $wrapper {
            fn find_all(&self) -> RepoResult<Vec<Student>> {
                (**self).find_all()
            }
            fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
                (**self).find_by_id(id)
            }
            fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
                (**self).find_by_email(email)
            }
            fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
                (**self).exists_by_email(email)
            }
            fn save(&self, full_name: &str, email: &str, age: Option<i32>) -> RepoResult<Student> {
                (**self).save(full_name, email, age)
            }
            fn update(&self, id: StudentId, full_name: &str, age: Option<i32>) -> RepoResult<Student> {
                (**self).update(id, full_name, age)
            }
            fn delete_by_id(&self, id: StudentId) -> RepoResult<bool> {
                (**self).delete_by_id(id)
            }
        }
    )+};
}

forward_student_repository!(&R, Box<R>);
