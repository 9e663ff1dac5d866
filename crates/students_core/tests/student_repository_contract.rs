//! Behavior both engines must share, run once per engine.

mod common;

use common::TestStore;
use std::collections::HashSet;
use students_core::{
    ErrorKind, OrmStudentRepository, RepoError, SqlStudentRepository, StudentRepository,
    StudentService,
};
use uuid::Uuid;

type SyncRepo<'a> = dyn StudentRepository + Sync + 'a;

fn sql_repo(store: &TestStore) -> Box<SyncRepo<'_>> {
    Box::new(SqlStudentRepository::new(store.provider.clone()))
}

fn orm_repo(store: &TestStore) -> Box<SyncRepo<'_>> {
    Box::new(OrmStudentRepository::new(&store.factory))
}

fn create_assigns_id_and_created_at(store: &TestStore, repo: &SyncRepo<'_>) {
    let created = repo
        .save("Alice Nguyen", "alice@example.com", Some(20))
        .unwrap();

    assert!(!created.id.is_nil());
    assert!(created.created_at > 0);
    assert_eq!(created.full_name, "Alice Nguyen");
    assert_eq!(created.email, "alice@example.com");
    assert_eq!(created.age, Some(20));

    let loaded = repo.find_by_id(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(store.row_count(), 1);
}

fn save_without_age_stores_null(_store: &TestStore, repo: &SyncRepo<'_>) {
    let created = repo.save("No Age", "noage@example.com", None).unwrap();
    assert_eq!(created.age, None);
    assert_eq!(repo.find_by_id(created.id).unwrap().unwrap().age, None);
}

fn duplicate_email_is_rejected_by_store(store: &TestStore, repo: &SyncRepo<'_>) {
    repo.save("Alice Nguyen", "alice@example.com", Some(20))
        .unwrap();

    let err = repo
        .save("Alice Again", "alice@example.com", Some(30))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert!(err.to_string().contains("alice@example.com"));
    assert_eq!(store.row_count(), 1);
}

fn email_match_is_case_sensitive(_store: &TestStore, repo: &SyncRepo<'_>) {
    repo.save("Lower", "case@example.com", None).unwrap();
    repo.save("Upper", "CASE@example.com", None).unwrap();

    assert!(repo.exists_by_email("case@example.com").unwrap());
    assert!(!repo.exists_by_email("Case@Example.com").unwrap());
    let upper = repo.find_by_email("CASE@example.com").unwrap().unwrap();
    assert_eq!(upper.full_name, "Upper");
}

fn find_by_email_and_exists(_store: &TestStore, repo: &SyncRepo<'_>) {
    assert!(!repo.exists_by_email("bob@example.com").unwrap());
    assert!(repo.find_by_email("bob@example.com").unwrap().is_none());

    let bob = repo.save("Bob Tran", "bob@example.com", Some(22)).unwrap();

    assert!(repo.exists_by_email("bob@example.com").unwrap());
    assert_eq!(repo.find_by_email("bob@example.com").unwrap(), Some(bob));
}

fn update_preserves_immutables(_store: &TestStore, repo: &SyncRepo<'_>) {
    let created = repo
        .save("Alice Nguyen", "alice@example.com", Some(20))
        .unwrap();

    let updated = repo.update(created.id, "Alice N.", Some(21)).unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.full_name, "Alice N.");
    assert_eq!(updated.age, Some(21));
    assert_eq!(updated.email, created.email);
    assert_eq!(updated.created_at, created.created_at);

    let loaded = repo.find_by_id(created.id).unwrap().unwrap();
    assert_eq!(loaded, updated);
}

fn update_can_clear_age(_store: &TestStore, repo: &SyncRepo<'_>) {
    let created = repo.save("Carol", "carol@example.com", Some(40)).unwrap();
    let updated = repo.update(created.id, "Carol", None).unwrap();
    assert_eq!(updated.age, None);
    assert_eq!(repo.find_by_id(created.id).unwrap().unwrap().age, None);
}

fn update_missing_leaves_store_unchanged(_store: &TestStore, repo: &SyncRepo<'_>) {
    repo.save("Alice Nguyen", "alice@example.com", Some(20))
        .unwrap();
    repo.save("Bob Tran", "bob@example.com", None).unwrap();
    let before = repo.find_all().unwrap();

    let missing = Uuid::new_v4();
    let err = repo.update(missing, "Ghost", Some(99)).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(repo.find_all().unwrap(), before);
}

fn delete_returns_true_exactly_once(_store: &TestStore, repo: &SyncRepo<'_>) {
    let created = repo.save("Dave", "dave@example.com", None).unwrap();

    assert!(repo.delete_by_id(created.id).unwrap());
    assert!(!repo.delete_by_id(created.id).unwrap());
    assert!(!repo.delete_by_id(Uuid::new_v4()).unwrap());
    assert!(repo.find_by_id(created.id).unwrap().is_none());
    assert!(!repo.exists_by_email("dave@example.com").unwrap());
}

fn deleted_email_can_be_reused(_store: &TestStore, repo: &SyncRepo<'_>) {
    let first = repo.save("Eve", "eve@example.com", None).unwrap();
    assert!(repo.delete_by_id(first.id).unwrap());

    let second = repo.save("Eve Again", "eve@example.com", None).unwrap();
    assert_ne!(first.id, second.id);
}

fn find_all_is_newest_first(store: &TestStore, repo: &SyncRepo<'_>) {
    assert!(repo.find_all().unwrap().is_empty());

    for (name, email) in [
        ("First", "first@example.com"),
        ("Second", "second@example.com"),
        ("Third", "third@example.com"),
    ] {
        repo.save(name, email, None).unwrap();
    }
    store.set_created_at("first@example.com", 1_000);
    store.set_created_at("second@example.com", 3_000);
    store.set_created_at("third@example.com", 2_000);

    let names: Vec<_> = repo
        .find_all()
        .unwrap()
        .into_iter()
        .map(|student| student.full_name)
        .collect();
    assert_eq!(names, vec!["Second", "Third", "First"]);
}

fn find_all_orders_by_created_at_non_increasing(
    _store: &TestStore,
    repo: &SyncRepo<'_>,
) {
    for index in 0..10 {
        repo.save(
            &format!("Student {index}"),
            &format!("student{index}@example.com"),
            Some(18 + index),
        )
        .unwrap();
    }

    let all = repo.find_all().unwrap();
    assert_eq!(all.len(), 10);
    assert!(all
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));
    assert_eq!(all[0].email, "student9@example.com");

    let emails: HashSet<_> = all.iter().map(|student| student.email.as_str()).collect();
    assert_eq!(emails.len(), all.len());
}

fn concurrent_duplicate_creates_admit_one(store: &TestStore, repo: &SyncRepo<'_>) {
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..6)
            .map(|index| {
                scope.spawn(move || {
                    repo.save(&format!("Racer {index}"), "race@example.com", None)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    for result in &results {
        if let Err(err) = result {
            assert_eq!(err.kind(), ErrorKind::ConstraintViolation, "{err}");
        }
    }
    assert_eq!(store.row_count(), 1);
}

fn service_scenario(store: &TestStore, repo: &SyncRepo<'_>) {
    let service = StudentService::new(repo);

    let alice = service
        .create("Alice Nguyen", "alice@example.com", Some(20))
        .unwrap();
    assert_eq!(alice.email, "alice@example.com");

    let duplicate = service
        .create("Alice Nguyen", "alice@example.com", Some(20))
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(store.row_count(), 1);

    let updated = service.update(alice.id, "Alice N.", Some(21)).unwrap();
    assert_eq!(updated.full_name, "Alice N.");
    assert_eq!(updated.age, Some(21));
    assert_eq!(updated.email, "alice@example.com");

    assert_eq!(
        service.read_by_email("alice@example.com").unwrap(),
        Some(updated.clone())
    );
    assert_eq!(service.read_all().unwrap(), vec![updated]);

    assert!(service.delete(alice.id).unwrap());
    assert!(!service.delete(alice.id).unwrap());
    assert!(service.read(alice.id).unwrap().is_none());
}

fn engines_are_interchangeable(store: &TestStore, repo: &SyncRepo<'_>) {
    let sql = SqlStudentRepository::new(store.provider.clone());
    let orm = OrmStudentRepository::new(&store.factory);

    let created = repo.save("Shared", "shared@example.com", Some(33)).unwrap();
    assert_eq!(sql.find_by_id(created.id).unwrap(), Some(created.clone()));
    assert_eq!(orm.find_by_id(created.id).unwrap(), Some(created.clone()));
    assert_eq!(sql.find_all().unwrap(), orm.find_all().unwrap());

    let via_sql = sql.save("Other", "shared@example.com", None).unwrap_err();
    let via_orm = orm.save("Other", "shared@example.com", None).unwrap_err();
    assert_eq!(via_sql.kind(), via_orm.kind());
    assert_eq!(via_sql.to_string(), via_orm.to_string());
}

macro_rules! contract_tests {
    ($engine:ident, $make:path) => {
        mod $engine {
            use super::*;

            fn run(check: fn(&TestStore, &SyncRepo<'_>)) {
                let store = TestStore::new();
                let repo = $make(&store);
                check(&store, repo.as_ref());
            }

            #[test]
            fn create_assigns_id_and_created_at() {
                run(super::create_assigns_id_and_created_at);
            }

            #[test]
            fn save_without_age_stores_null() {
                run(super::save_without_age_stores_null);
            }

            #[test]
            fn duplicate_email_is_rejected_by_store() {
                run(super::duplicate_email_is_rejected_by_store);
            }

            #[test]
            fn email_match_is_case_sensitive() {
                run(super::email_match_is_case_sensitive);
            }

            #[test]
            fn find_by_email_and_exists() {
                run(super::find_by_email_and_exists);
            }

            #[test]
            fn update_preserves_immutables() {
                run(super::update_preserves_immutables);
            }

            #[test]
            fn update_can_clear_age() {
                run(super::update_can_clear_age);
            }

            #[test]
            fn update_missing_leaves_store_unchanged() {
                run(super::update_missing_leaves_store_unchanged);
            }

            #[test]
            fn delete_returns_true_exactly_once() {
                run(super::delete_returns_true_exactly_once);
            }

            #[test]
            fn deleted_email_can_be_reused() {
                run(super::deleted_email_can_be_reused);
            }

            #[test]
            fn find_all_is_newest_first() {
                run(super::find_all_is_newest_first);
            }

            #[test]
            fn find_all_orders_by_created_at_non_increasing() {
                run(super::find_all_orders_by_created_at_non_increasing);
            }

            #[test]
            fn concurrent_duplicate_creates_admit_one() {
                run(super::concurrent_duplicate_creates_admit_one);
            }

            #[test]
            fn service_scenario() {
                run(super::service_scenario);
            }

            #[test]
            fn engines_are_interchangeable() {
                run(super::engines_are_interchangeable);
            }
        }
    };
}

contract_tests!(sql, sql_repo);
contract_tests!(orm, orm_repo);
