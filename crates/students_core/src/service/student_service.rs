//! Student use-case service.
//!
//! # Responsibility
//! - Provide the in-process CRUD contract consumed by boundary layers.
//! - Reject duplicate emails before writing.
//!
//! # Invariants
//! - The `exists_by_email` pre-check is advisory; the store's UNIQUE
//!   constraint still decides concurrent creates.
//! - The service stays storage-agnostic.

use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::{RepoError, RepoResult, StudentRepository};
use log::info;

/// Use-case wrapper over any `StudentRepository` engine.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a student; duplicate emails fail with `ConstraintViolation`.
    pub fn create(&self, full_name: &str, email: &str, age: Option<i32>) -> RepoResult<Student> {
        if self.repo.exists_by_email(email)? {
            info!("event=student_create module=service status=rejected reason=duplicate_email");
            return Err(RepoError::duplicate_email(email));
        }
        self.repo.save(full_name, email, age)
    }

    pub fn read(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.repo.find_by_id(id)
    }

    pub fn read_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.repo.find_by_email(email)
    }

    /// Newest first.
    pub fn read_all(&self) -> RepoResult<Vec<Student>> {
        self.repo.find_all()
    }

    /// Returns repository `NotFound` unchanged for unknown ids.
    pub fn update(&self, id: StudentId, full_name: &str, age: Option<i32>) -> RepoResult<Student> {
        self.repo.update(id, full_name, age)
    }

    pub fn delete(&self, id: StudentId) -> RepoResult<bool> {
        self.repo.delete_by_id(id)
    }
}
