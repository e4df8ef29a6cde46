//! Remote document store tier.
//!
//! # Responsibilities
//! - Talk to a networked document database over its JSON action API
//! - Fail fast at connect time when no connection string is configured or
//!   the endpoint does not answer a ping
//! - Treat 4xx answers as rejections (not retried) and everything else that
//!   fails as transient
//! - Wrap every call in a deadline and the retry executor
//! - Keep the connection pool tracker informed of liveness
//!
//! # Wire protocol
//! ```text
//! GET  {url}/ping               → 2xx when live
//! POST {url}/action/findOne     {dataSource, database, collection, filter}
//!                               → {"document": {...} | null}
//! POST {url}/action/insertOne   {dataSource, database, collection, document}
//!                               → {"insertedId": ...}
//! ```
//!
//! Email uniqueness is a find-then-insert pre-check, not a unique index:
//! two concurrent registrations can both pass the check and both insert.
//! Deployments that need the guarantee must add a unique index on `email`
//! in the database itself.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::RemoteStoreConfig;
use crate::observability::metrics;
use crate::resilience::pool::ConnectionPool;
use crate::resilience::retries::{execute_with_retry_when, RetryPolicy};
use crate::resilience::timeouts::with_timeout;
use crate::security::PasswordHasher;
use crate::store::error::{StoreError, StoreResult};
use crate::store::record::{normalize_email, UserRecord};
use crate::store::traits::UserStore;

pub const TIER: &str = "remote";

/// HTTP document-store tier.
pub struct RemoteStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    data_source: String,
    database: String,
    collection: String,
    timeout: Duration,
    retry: RetryPolicy,
    pool: Arc<ConnectionPool>,
    connection_id: String,
    hasher: PasswordHasher,
}

// Hand-written so the API key never reaches logs.
impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("connection_id", &self.connection_id)
            .finish_non_exhaustive()
    }
}

impl RemoteStore {
    /// Build the client without touching the network. Fails only when no
    /// connection string is configured or it does not parse.
    pub fn new(
        config: &RemoteStoreConfig,
        retry: RetryPolicy,
        pool: Arc<ConnectionPool>,
        hasher: PasswordHasher,
    ) -> StoreResult<Self> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::unavailable(TIER, "no connection string configured"))?;
        let parsed = url::Url::parse(raw)
            .map_err(|e| StoreError::unavailable(TIER, format!("invalid URL: {}", e)))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::unavailable(TIER, e))?;

        let connection_id = format!(
            "{}:{}/{}",
            TIER,
            parsed.host_str().unwrap_or("unknown"),
            config.database
        );

        Ok(Self {
            client,
            base_url: raw.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            data_source: config.data_source.clone(),
            database: config.database.clone(),
            collection: config.collection.clone(),
            timeout: config.timeout(),
            retry,
            pool,
            connection_id,
            hasher,
        })
    }

    /// Connect and verify liveness with a single ping.
    pub async fn connect(
        config: &RemoteStoreConfig,
        retry: RetryPolicy,
        pool: Arc<ConnectionPool>,
        hasher: PasswordHasher,
    ) -> StoreResult<Self> {
        let store = Self::new(config, retry, pool, hasher)?;
        store.ping().await?;
        store.track_connection();
        Ok(store)
    }

    /// Register this connection with the pool tracker after a good ping.
    pub fn track_connection(&self) {
        if !self.pool.add_connection(&self.connection_id) {
            tracing::warn!(
                connection = %self.connection_id,
                "Connection pool full, remote connection untracked"
            );
        }
        tracing::info!(
            connection = %self.connection_id,
            collection = %self.collection,
            "Connected to remote document store"
        );
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Liveness check. Never retried.
    pub async fn ping(&self) -> StoreResult<()> {
        let mut request = self.client.get(format!("{}/ping", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = with_timeout(self.timeout, request.send())
            .await
            .map_err(|e| StoreError::unavailable(TIER, e))?
            .map_err(|e| StoreError::unavailable(TIER, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error("ping", status, String::new()))
        }
    }

    fn envelope(&self, extra: (&str, Value)) -> Value {
        let mut body = json!({
            "dataSource": self.data_source,
            "database": self.database,
            "collection": self.collection,
        });
        body[extra.0] = extra.1;
        body
    }

    async fn send_action(&self, action: &str, body: &Value) -> StoreResult<Value> {
        let mut request = self
            .client
            .post(format!("{}/action/{}", self.base_url, action))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = with_timeout(self.timeout, request.send())
            .await
            .map_err(|e| StoreError::unavailable(TIER, e))?
            .map_err(|e| StoreError::unavailable(TIER, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(action, status, text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::unavailable(TIER, format!("{} response: {}", action, e)))
    }

    /// Run an action with retries and record the outcome on the pool entry.
    async fn action(&self, action: &str, body: Value) -> StoreResult<Value> {
        let label = format!("{}.{}", TIER, action);
        let result = execute_with_retry_when(&label, &self.retry, StoreError::is_retryable, || {
            self.send_action(action, &body)
        })
        .await;

        match &result {
            Ok(_) => {
                if !self.pool.get_connection(&self.connection_id) {
                    self.pool.add_connection(&self.connection_id);
                }
            }
            Err(e) => {
                tracing::warn!(
                    connection = %self.connection_id,
                    error = %e,
                    "Remote action failed"
                );
                self.pool.mark_unhealthy(&self.connection_id);
            }
        }
        result
    }

    async fn find_one(&self, filter: Value) -> StoreResult<Option<UserRecord>> {
        let response = self.action("findOne", self.envelope(("filter", filter))).await?;
        match response.get("document") {
            None | Some(Value::Null) => Ok(None),
            Some(doc) => serde_json::from_value(doc.clone()).map(Some).map_err(|e| {
                StoreError::unavailable(TIER, format!("malformed user document: {}", e))
            }),
        }
    }

    async fn insert_one(&self, record: &UserRecord) -> StoreResult<()> {
        let document =
            serde_json::to_value(record).map_err(|e| StoreError::unavailable(TIER, e))?;
        self.action("insertOne", self.envelope(("document", document))).await?;
        Ok(())
    }
}

/// 4xx means the backend refused the request itself; anything else is
/// treated as transient.
fn status_error(action: &str, status: reqwest::StatusCode, body: String) -> StoreError {
    let reason = if body.is_empty() {
        format!("{} returned {}", action, status)
    } else {
        format!("{} returned {}: {}", action, status, body)
    };
    if status.is_client_error() {
        StoreError::Rejected { tier: TIER, reason }
    } else {
        StoreError::unavailable(TIER, reason)
    }
}

#[async_trait]
impl UserStore for RemoteStore {
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

        if self.find_one(json!({ "email": normalize_email(email) })).await?.is_some() {
            metrics::record_store_operation(TIER, "create", "duplicate", start);
            return Err(StoreError::DuplicateEmail(email.to_string()));
        }

        let hash = self.hasher.hash_async(password).await?;
        let record = UserRecord::new(email, hash, name);

        match self.insert_one(&record).await {
            Ok(()) => {
                tracing::info!(tier = TIER, user_id = %record.id, "User created");
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
        let found = self.find_one(json!({ "email": normalize_email(email) })).await?;
        let outcome = if found.is_some() { "hit" } else { "miss" };
        metrics::record_store_operation(TIER, "find_by_email", outcome, start);
        Ok(found)
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        let start = Instant::now();
        let found = self.find_one(json!({ "id": id })).await?;
        let outcome = if found.is_some() { "hit" } else { "miss" };
        metrics::record_store_operation(TIER, "find_by_id", outcome, start);
        Ok(found)
    }
}
