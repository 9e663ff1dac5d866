//! Student domain model.
//!
//! # Responsibility
//! - Define the immutable `Student` value returned by every repository.
//! - Define the ORM-managed `StudentEntity` and its mapping to `Student`.
//!
//! # Invariants
//! - `id` and `created_at` are always store-assigned.
//! - `email` never changes after creation.

pub mod student;
pub mod student_entity;
