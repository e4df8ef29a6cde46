//! Read-only demo seed tier.
//!
//! Built once at startup from the configured demo credentials. Passwords are
//! hashed at construction so lookups return records shaped exactly like real
//! ones. Ids are stable across restarts (`demo-1`, `demo-2`, ...).

use async_trait::async_trait;
use chrono::Utc;

use crate::config::DemoUserConfig;
use crate::security::PasswordHasher;
use crate::store::error::{StoreError, StoreResult};
use crate::store::record::{normalize_email, UserRecord};
use crate::store::traits::UserStore;

pub const TIER: &str = "demo";

#[derive(Debug, Default)]
pub struct DemoSeedStore {
    users: Vec<UserRecord>,
}

impl DemoSeedStore {
    pub fn new(seeds: &[DemoUserConfig], hasher: PasswordHasher) -> StoreResult<Self> {
        let now = Utc::now();
        let mut users: Vec<UserRecord> = Vec::with_capacity(seeds.len());

        for (i, seed) in seeds.iter().enumerate() {
            if users.iter().any(|u| u.matches_email(&seed.email)) {
                tracing::warn!(email = %seed.email, "Duplicate demo user ignored");
                continue;
            }
            users.push(UserRecord {
                id: format!("demo-{}", i + 1),
                email: normalize_email(&seed.email),
                password_hash: hasher.hash(&seed.password)?,
                name: seed.name.clone(),
                created_at: now,
                updated_at: now,
            });
        }

        if !users.is_empty() {
            tracing::info!(count = users.len(), "Demo users seeded");
        }
        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for DemoSeedStore {
    fn tier(&self) -> &'static str {
        TIER
    }

    async fn create_user(
        &self,
        _email: &str,
        _password: &str,
        _name: &str,
    ) -> StoreResult<UserRecord> {
        Err(StoreError::ReadOnly(TIER))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.iter().find(|u| u.matches_email(email)).cloned())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::password::MIN_COST;
    use crate::security::verify_password;

    fn seeds() -> Vec<DemoUserConfig> {
        vec![
            DemoUserConfig {
                email: "Demo@HireMe.dev".into(),
                password: "Demo1234".into(),
                name: "Demo User".into(),
            },
            DemoUserConfig {
                email: "demo@hireme.dev".into(),
                password: "Other1234".into(),
                name: "Shadow".into(),
            },
        ]
    }

    #[tokio::test]
    async fn test_seeded_lookup() {
        let store = DemoSeedStore::new(&seeds(), PasswordHasher::new(MIN_COST)).unwrap();
        assert_eq!(store.len(), 1);

        let user = store.find_user_by_email("DEMO@hireme.dev").await.unwrap().unwrap();
        assert_eq!(user.id, "demo-1");
        assert_eq!(user.email, "demo@hireme.dev");
        assert!(verify_password("Demo1234", &user.password_hash));

        assert!(store.find_user_by_id("demo-1").await.unwrap().is_some());
        assert!(store.find_user_by_id("demo-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_only() {
        let store = DemoSeedStore::new(&seeds(), PasswordHasher::new(MIN_COST)).unwrap();
        let err = store.create_user("new@hireme.dev", "Secret123", "New").await.unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly("demo")));
    }
}
