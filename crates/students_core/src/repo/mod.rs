//! Student repository contract and its two persistence engines.
//!
//! # Responsibility
//! - `sql_student_repo`: explicit parameterized statements per connection.
//! - `orm_student_repo`: entity queries and transactions per session.
//!
//! # Invariants
//! - Both engines honor the same `StudentRepository` pre/postconditions.
//! - Store resources never outlive the call that acquired them.

pub mod orm_student_repo;
pub mod sql_student_repo;
pub mod student_repo;
