#![allow(dead_code)]

use rusqlite::Connection;
use students_core::{ConnectionProvider, DbSettings, SessionFactory};
use tempfile::TempDir;

/// File-backed store living in its own temp directory.
pub struct TestStore {
    pub provider: ConnectionProvider,
    pub factory: SessionFactory,
    _dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("students.db");
        let provider =
            ConnectionProvider::new(DbSettings::sqlite(url.to_str().unwrap())).unwrap();
        let factory = SessionFactory::build(provider.clone()).unwrap();
        Self {
            provider,
            factory,
            _dir: dir,
        }
    }

    /// Raw connection for fixture setup and out-of-band assertions.
    pub fn raw(&self) -> Connection {
        self.provider.get_connection().unwrap()
    }

    pub fn row_count(&self) -> i64 {
        self.raw()
            .query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
            .unwrap()
    }

    pub fn set_created_at(&self, email: &str, created_at: i64) {
        let changed = self
            .raw()
            .execute(
                "UPDATE students SET created_at = ?1 WHERE email = ?2;",
                rusqlite::params![created_at, email],
            )
            .unwrap();
        assert_eq!(changed, 1, "no student with email {email}");
    }
}
