//! Concurrent registrations against the durable file tier.

use std::sync::Arc;

use hireme_auth::resilience::ConnectionPool;
use hireme_auth::security::PasswordHasher;
use hireme_auth::store::{FileStore, StoreError, TieredStore, UserStore};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_email_exactly_one_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        FileStore::open(dir.path().join("users.json"), PasswordHasher::new(4))
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let email = if i % 2 == 0 { "race@example.com" } else { "RACE@example.com" };
            store.create_user(email, "Secret123", &format!("Racer {}", i)).await
        }));
    }

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::DuplicateEmail(_)) => duplicates += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(store.read_all().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_emails_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let store = Arc::new(FileStore::open(&path, PasswordHasher::new(4)).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .create_user(&format!("user{}@example.com", i), "Secret123", &format!("User {}", i))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Reopen from disk: every write survived.
    let reopened = FileStore::open(&path, PasswordHasher::new(4)).await.unwrap();
    let users = reopened.read_all().await.unwrap();
    assert_eq!(users.len(), 20);
    for i in 0..20 {
        let email = format!("user{}@example.com", i);
        assert!(reopened.find_user_by_email(&email).await.unwrap().is_some(), "{} lost", email);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_facade_serializes_duplicates_on_file_tier() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(dir.path());
    let store = Arc::new(
        TieredStore::from_config(&config, Arc::new(ConnectionPool::default()))
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.create_user("frank@example.com", "Secret123", "Frank").await
        }));
    }

    let results: Vec<_> = futures_results(handles).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, StoreError::DuplicateEmail(_))));
}

async fn futures_results<T>(handles: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.unwrap());
    }
    out
}
