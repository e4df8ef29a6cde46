//! User store trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::store::error::StoreResult;
use crate::store::record::UserRecord;

/// Contract shared by every storage tier.
///
/// Implementations must be thread-safe (`Send + Sync`) as they are called
/// concurrently from request handlers.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Short tier name used in logs and metrics.
    fn tier(&self) -> &'static str;

    /// Create a user, hashing `password`.
    ///
    /// # Returns
    /// * `Ok(UserRecord)` - the stored record
    /// * `Err(StoreError::DuplicateEmail)` - the normalized email already exists in this tier
    /// * `Err(StoreError::BackendUnavailable)` - the tier's I/O failed
    async fn create_user(&self, email: &str, password: &str, name: &str) -> StoreResult<UserRecord>;

    /// Case-insensitive lookup by email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// Lookup by record id.
    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>>;
}

#[async_trait]
impl<S: UserStore + ?Sized> UserStore for Arc<S> {
    fn tier(&self) -> &'static str {
        (**self).tier()
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<UserRecord> {
        (**self).create_user(email, password, name).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        (**self).find_user_by_email(email).await
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        (**self).find_user_by_id(id).await
    }
}
