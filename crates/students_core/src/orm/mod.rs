//! Minimal object-relational session layer over SQLite.
//!
//! # Responsibility
//! - Map entity types to tables (`Entity`).
//! - Provide sessions with unit-of-work semantics: persist, dirty-checked
//!   flush, refresh, remove and declarative queries.
//! - Scope writes in explicit session transactions.
//!
//! # Invariants
//! - Sessions are opened per operation and never retained.
//! - Transactions roll back unless explicitly committed.

pub mod entity;
pub mod global;
pub mod query;
pub mod session;
pub mod session_factory;
pub mod transaction;

pub use entity::{Entity, EntityKey};
pub use query::{Order, Query, ROWID};
pub use session::Session;
pub use session_factory::SessionFactory;
pub use transaction::SessionTransaction;
