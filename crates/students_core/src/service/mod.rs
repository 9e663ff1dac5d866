//! Student use-case services.
//!
//! # Responsibility
//! - Expose the create/read/update/delete contract to boundary layers.
//! - Keep boundary layers independent of which engine persists students.

pub mod student_service;
