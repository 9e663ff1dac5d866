//! Student value entity.
//!
//! # Invariants
//! - `id` is generated by the store on insert and never reused.
//! - `email` is unique across all students (exact, case-sensitive match).
//! - `created_at` is the store clock at insert time, in epoch milliseconds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned student identifier.
pub type StudentId = Uuid;

/// Snapshot of one persisted student row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub full_name: String,
    pub email: String,
    pub age: Option<i32>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::Student;
    use uuid::Uuid;

    #[test]
    fn serializes_with_camel_case_keys() {
        let student = Student {
            id: Uuid::nil(),
            full_name: "Alice Nguyen".to_string(),
            email: "alice@example.com".to_string(),
            age: None,
            created_at: 1_700_000_000_000,
        };

        let value = serde_json::to_value(&student).unwrap();
        assert_eq!(value["fullName"], "Alice Nguyen");
        assert_eq!(value["createdAt"], 1_700_000_000_000_i64);
        assert!(value["age"].is_null());
    }
}
