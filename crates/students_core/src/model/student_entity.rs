//! ORM-managed student entity.
//!
//! # Invariants
//! - `id` and `created_at` are `None` until the store populates them.
//! - Only `full_name` and `age` have setters; `email` is fixed at creation.

use crate::model::student::{Student, StudentId};
use crate::orm::entity::{parse_key, Entity, EntityKey};
use crate::repo::student_repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;

/// Mutable row state tracked by an ORM session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentEntity {
    id: Option<StudentId>,
    full_name: String,
    email: String,
    age: Option<i32>,
    created_at: Option<i64>,
}

impl StudentEntity {
    /// Transient entity; persist it to obtain an id.
    pub fn new(full_name: impl Into<String>, email: impl Into<String>, age: Option<i32>) -> Self {
        Self {
            id: None,
            full_name: full_name.into(),
            email: email.into(),
            age,
            created_at: None,
        }
    }

    pub fn id(&self) -> Option<StudentId> {
        self.id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn age(&self) -> Option<i32> {
        self.age
    }

    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    pub fn set_full_name(&mut self, full_name: impl Into<String>) {
        self.full_name = full_name.into();
    }

    pub fn set_age(&mut self, age: Option<i32>) {
        self.age = age;
    }
}

impl TryFrom<StudentEntity> for Student {
    type Error = RepoError;

    fn try_from(entity: StudentEntity) -> RepoResult<Self> {
        let id = entity.id.ok_or_else(|| {
            RepoError::InvalidData("student entity has no store-assigned id".to_string())
        })?;
        let created_at = entity.created_at.ok_or_else(|| {
            RepoError::InvalidData(format!("student {id} has no store-assigned created_at"))
        })?;
        Ok(Student {
            id,
            full_name: entity.full_name,
            email: entity.email,
            age: entity.age,
            created_at,
        })
    }
}

impl Entity for StudentEntity {
    const TABLE: &'static str = "students";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "full_name", "email", "age", "created_at"];

    fn key(&self) -> Option<EntityKey> {
        self.id
    }

    fn assign_key(&mut self, key: EntityKey) {
        self.id = Some(key);
    }

    fn insert_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("full_name", Value::Text(self.full_name.clone())),
            ("email", Value::Text(self.email.clone())),
            ("age", age_value(self.age)),
        ]
    }

    fn mutable_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("full_name", Value::Text(self.full_name.clone())),
            ("age", age_value(self.age)),
        ]
    }

    fn load(row: &Row<'_>) -> RepoResult<Self> {
        let id_text: String = row.get("id")?;
        Ok(Self {
            id: Some(parse_key::<Self>(&id_text)?),
            full_name: row.get("full_name")?,
            email: row.get("email")?,
            age: row.get("age")?,
            created_at: Some(row.get("created_at")?),
        })
    }
}

fn age_value(age: Option<i32>) -> Value {
    age.map_or(Value::Null, |age| Value::Integer(i64::from(age)))
}

#[cfg(test)]
mod tests {
    use super::StudentEntity;
    use crate::model::student::Student;
    use crate::orm::Entity;
    use crate::repo::student_repo::RepoError;
    use rusqlite::types::Value;
    use uuid::Uuid;

    #[test]
    fn transient_entity_cannot_become_student() {
        let entity = StudentEntity::new("Alice Nguyen", "alice@example.com", Some(20));
        let err = Student::try_from(entity).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("id")));
    }

    #[test]
    fn flushed_but_unrefreshed_entity_lacks_created_at() {
        let mut entity = StudentEntity::new("Alice Nguyen", "alice@example.com", Some(20));
        entity.assign_key(Uuid::new_v4());
        let err = Student::try_from(entity).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("created_at")));
    }

    #[test]
    fn email_is_not_a_mutable_column() {
        let entity = StudentEntity::new("Bob", "bob@example.com", None);
        let columns: Vec<_> = entity
            .mutable_values()
            .into_iter()
            .map(|(column, _)| column)
            .collect();
        assert_eq!(columns, vec!["full_name", "age"]);
        assert!(entity
            .insert_values()
            .contains(&("age", Value::Null)));
    }
}
