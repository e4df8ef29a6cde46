//! Durable file-backed user store.
//!
//! The whole collection is one pretty-printed JSON array on local disk.
//! Every write rewrites the full document.
//!
//! # Concurrency
//! Read-modify-write cycles are serialized by a per-store async mutex, and
//! each write lands in a sibling temp file that is renamed over the
//! live file. Two concurrent registrations for the same email therefore see
//! each other: exactly one succeeds. Readers never take the lock; the rename
//! guarantees they observe either the old or the new document.
//!
//! Separate processes sharing the same file are not coordinated.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::security::PasswordHasher;
use crate::store::error::{StoreError, StoreResult};
use crate::store::record::UserRecord;
use crate::store::traits::UserStore;

pub const TIER: &str = "file";

/// JSON-file tier.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    hasher: PasswordHasher,
}

impl FileStore {
    /// Open the users file, creating it (and parent directories) as an empty
    /// collection when missing. Fails if the location is not writable or the
    /// existing document does not parse.
    pub async fn open(path: impl AsRef<Path>, hasher: PasswordHasher) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::unavailable(TIER, format!("{}: {}", parent.display(), e))
            })?;
        }

        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::unavailable(TIER, e))?;
        let store = Self {
            path,
            write_lock: Mutex::new(()),
            hasher,
        };

        if exists {
            let users = store.read_all().await?;
            tracing::info!(path = %store.path.display(), users = users.len(), "Loaded users file");
        } else {
            store.write_all(&[]).await?;
            tracing::info!(path = %store.path.display(), "Created empty users file");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read the full collection.
    pub async fn read_all(&self) -> StoreResult<Vec<UserRecord>> {
        let raw = fs::read_to_string(&self.path).await.map_err(|e| {
            StoreError::unavailable(TIER, format!("{}: {}", self.path.display(), e))
        })?;

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            let reason = format!("corrupt users file {}: {}", self.path.display(), e);
            StoreError::unavailable(TIER, reason)
        })
    }

    /// Replace the full collection.
    async fn write_all(&self, users: &[UserRecord]) -> StoreResult<()> {
        let body =
            serde_json::to_vec_pretty(users).map_err(|e| StoreError::unavailable(TIER, e))?;
        let tmp = self.temp_path();

        fs::write(&tmp, body)
            .await
            .map_err(|e| StoreError::unavailable(TIER, format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            StoreError::unavailable(TIER, format!("{}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for FileStore {
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

        let existing = self.read_all().await.inspect_err(|_| {
            metrics::record_store_operation(TIER, "create", "error", start);
        })?;
        if existing.iter().any(|u| u.matches_email(email)) {
            tracing::debug!(tier = TIER, email, "User already exists");
            metrics::record_store_operation(TIER, "create", "duplicate", start);
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }
        drop(existing);

        let hash = self.hasher.hash_async(password).await?;
        let record = UserRecord::new(email, hash, name);

        // Re-read and re-check under the lock: another writer may have
        // landed while we were hashing.
        let _guard = self.write_lock.lock().await;
        let mut users = self.read_all().await.inspect_err(|_| {
            metrics::record_store_operation(TIER, "create", "error", start);
        })?;
        if users.iter().any(|u| u.matches_email(email)) {
            metrics::record_store_operation(TIER, "create", "duplicate", start);
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }
        users.push(record.clone());

        match self.write_all(&users).await {
            Ok(()) => {
                tracing::info!(
                    tier = TIER,
                    user_id = %record.id,
                    total = users.len(),
                    "User created"
                );
                metrics::record_store_operation(TIER, "create", "ok", start);
                Ok(record)
            }
            Err(e) => {
                metrics::record_store_operation(TIER, "create", "error", start);
                Err(e)
            }
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let start = Instant::now();
        let users = self.read_all().await?;
        let found = users.into_iter().find(|u| u.matches_email(email));
        let outcome = if found.is_some() { "hit" } else { "miss" };
        metrics::record_store_operation(TIER, "find_by_email", outcome, start);
        Ok(found)
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        let start = Instant::now();
        let users = self.read_all().await?;
        let found = users.into_iter().find(|u| u.id == id);
        let outcome = if found.is_some() { "hit" } else { "miss" };
        metrics::record_store_operation(TIER, "find_by_id", outcome, start);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::password::MIN_COST;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(MIN_COST)
    }

    #[tokio::test]
    async fn test_open_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/users.json");
        let store = FileStore::open(&path, hasher()).await.unwrap();

        assert!(path.exists());
        assert!(store.read_all().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");

        let created = {
            let store = FileStore::open(&path, hasher()).await.unwrap();
            store.create_user("alice@example.com", "Secret123", "Alice").await.unwrap()
        };

        let reopened = FileStore::open(&path, hasher()).await.unwrap();
        let found = reopened.find_user_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found.email, "alice@example.com");
        assert!(crate::security::verify_password("Secret123", &found.password_hash));
    }

    #[tokio::test]
    async fn test_duplicate_and_case_insensitive_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("users.json"), hasher()).await.unwrap();
        store.create_user("alice@example.com", "Secret123", "Alice").await.unwrap();

        let err = store.create_user("Alice@Example.com", "Secret123", "Alice").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));
        assert!(store.find_user_by_email("ALICE@EXAMPLE.COM").await.unwrap().is_some());
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_racing_same_email_rechecked_under_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("users.json"), hasher()).await.unwrap();

        // Both can pass the unlocked pre-check and hash concurrently.
        let (a, b) = tokio::join!(
            store.create_user("rita@example.com", "Secret123", "Rita"),
            store.create_user("RITA@example.com", "Secret456", "Rita B"),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser, Err(StoreError::DuplicateEmail(_))));
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileStore::open(&path, hasher()).await.unwrap_err();
        assert!(err.is_tier_failure());
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, "").unwrap();
        let store = FileStore::open(&path, hasher()).await.unwrap();
        assert!(store.find_user_by_email("x@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("users.json"), hasher()).await.unwrap();
        store.create_user("bob@example.com", "Secret123", "Bob").await.unwrap();
        assert!(!store.temp_path().exists());
    }
}
