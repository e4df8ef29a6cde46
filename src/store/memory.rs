//! Volatile in-memory user store.
//!
//! Records live in an ordered list owned by this instance. Nothing survives a
//! restart, and separate processes each see their own disjoint set of users.

use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::observability::metrics;
use crate::security::PasswordHasher;
use crate::store::error::{StoreError, StoreResult};
use crate::store::record::UserRecord;
use crate::store::traits::UserStore;

pub const TIER: &str = "memory";

/// In-memory tier backed by an insertion-ordered `Vec`.
#[derive(Debug)]
pub struct MemoryStore {
    users: RwLock<Vec<UserRecord>>,
    hasher: PasswordHasher,
}

impl MemoryStore {
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            hasher,
        }
    }

    /// Seed with existing records (duplicates by email are dropped).
    pub fn with_records(hasher: PasswordHasher, records: Vec<UserRecord>) -> Self {
        let mut users: Vec<UserRecord> = Vec::with_capacity(records.len());
        for record in records {
            if !users.iter().any(|u| u.matches_email(&record.email)) {
                users.push(record);
            }
        }
        Self {
            users: RwLock::new(users),
            hasher,
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Snapshot of all records in insertion order.
    pub async fn records(&self) -> Vec<UserRecord> {
        self.users.read().await.clone()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    fn tier(&self) -> &'static str {
        TIER
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<UserRecord> {
        let start = Instant::now();

        if self.find_user_by_email(email).await?.is_some() {
            tracing::debug!(tier = TIER, email, "User already exists");
            metrics::record_store_operation(TIER, "create", "duplicate", start);
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }

        let hash = self.hasher.hash_async(password).await?;
        let record = UserRecord::new(email, hash, name);

        // Re-check under the write lock: another request may have won the
        // race while we were hashing.
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.matches_email(email)) {
            metrics::record_store_operation(TIER, "create", "duplicate", start);
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }
        users.push(record.clone());
        drop(users);

        tracing::info!(tier = TIER, user_id = %record.id, "User created");
        metrics::record_store_operation(TIER, "create", "ok", start);
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let users = self.users.read().await;
        let found = users.iter().find(|u| u.matches_email(email)).cloned();
        tracing::trace!(tier = TIER, email, found = found.is_some(), "Lookup by email");
        Ok(found)
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::password::MIN_COST;
    use std::sync::Arc;

    fn store() -> MemoryStore {
        MemoryStore::new(PasswordHasher::new(MIN_COST))
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = store();
        let created = store.create_user("alice@example.com", "Secret123", "Alice").await.unwrap();

        let by_email = store.find_user_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email, created);
        assert_eq!(by_email.name, "Alice");
        assert!(crate::security::verify_password("Secret123", &by_email.password_hash));

        let by_id = store.find_user_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");
        assert!(store.find_user_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_case_insensitive_duplicate() {
        let store = store();
        store.create_user("alice@example.com", "Secret123", "Alice").await.unwrap();
        let err = store
            .create_user("ALICE@example.com", "Other4567", "Someone Else")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));

        let found = store.find_user_by_email("Alice@Example.com").await.unwrap();
        assert!(found.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..8 {
            let s = store.clone();
            handles.push(tokio::spawn(async move {
                s.create_user("race@example.com", "Secret123", &format!("Racer {}", i)).await
            }));
        }

        let mut ok = 0;
        let mut dup = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::DuplicateEmail(_)) => dup += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
    }

    #[tokio::test]
    async fn test_instances_are_isolated() {
        let a = store();
        let b = store();
        a.create_user("alice@example.com", "Secret123", "Alice").await.unwrap();
        assert!(b.find_user_by_email("alice@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_with_records_drops_duplicates() {
        let r1 = UserRecord::new("a@example.com", "h".into(), "A");
        let r2 = UserRecord::new("A@example.com", "h".into(), "A2");
        let store = MemoryStore::with_records(PasswordHasher::new(MIN_COST), vec![r1, r2]);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.records().await[0].name, "A");
    }
}
