//! Student persistence core.
//! Two interchangeable CRUD engines (raw SQL and ORM sessions) over one store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod orm;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, DbSettings, LoggingSettings};
pub use db::{ConnectionProvider, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::student::{Student, StudentId};
pub use model::student_entity::StudentEntity;
pub use orm::global::{close_session_factory, init_session_factory, session_factory};
pub use orm::{Session, SessionFactory};
pub use repo::orm_student_repo::OrmStudentRepository;
pub use repo::sql_student_repo::SqlStudentRepository;
pub use repo::student_repo::{ErrorKind, RepoError, RepoResult, StudentRepository};
pub use service::student_service::StudentService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
