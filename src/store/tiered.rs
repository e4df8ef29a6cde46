//! Tiered store facade.
//!
//! # Precedence
//! The chain is assembled once by [`TieredStore::from_config`] and never
//! re-evaluated:
//! ```text
//! remote (configured, behind a circuit breaker; tripped if the startup ping fails)
//!     → file (users file opened)
//!     → memory (always)
//!     → demo seed (lookups only, read-only)
//! ```
//! Real records always win over demo users, and a demo email cannot be
//! registered.
//!
//! # Failure semantics
//! - Writes go to the first tier that accepts; unavailable tiers are logged,
//!   counted and skipped. When every tier fails the last error propagates.
//! - Lookups return the first match. Tier errors are logged and only surface
//!   when no tier produced an answer at all.
//! - Duplicate and validation failures are returned immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::AppConfig;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::pool::{ConnectionPool, PoolStats};
use crate::security::validation::{validate_credentials, validate_registration};
use crate::security::PasswordHasher;
use crate::store::demo::DemoSeedStore;
use crate::store::error::{StoreError, StoreResult};
use crate::store::file::FileStore;
use crate::store::memory::MemoryStore;
use crate::store::record::{UserProfile, UserRecord};
use crate::store::remote::RemoteStore;
use crate::store::traits::UserStore;

const TIER: &str = "tiered";

/// One link of the chain: a store plus an optional breaker.
struct Tier {
    store: Arc<dyn UserStore>,
    breaker: Option<CircuitBreaker>,
}

impl Tier {
    fn name(&self) -> &'static str {
        self.store.tier()
    }

    /// Gate check. An open breaker means the tier is skipped.
    fn admit(&self) -> StoreResult<()> {
        match &self.breaker {
            Some(breaker) if breaker.is_open() => Err(StoreError::CircuitOpen(self.name())),
            _ => Ok(()),
        }
    }

    /// Feed the outcome to the breaker. Only backend failures count against it.
    fn observe<T>(&self, result: &StoreResult<T>) {
        if let Some(breaker) = &self.breaker {
            match result {
                Err(e) if e.is_backend_failure() => breaker.record_failure(),
                _ => breaker.record_success(),
            }
        }
    }
}

/// Per-tier entry in [`StoreStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct TierStatus {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaker: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<u32>,
}

/// Snapshot of the chain for health reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub tiers: Vec<TierStatus>,
    pub demo_users: usize,
    pub pool: PoolStats,
}

/// The single store the route layer talks to.
pub struct TieredStore {
    tiers: Vec<Tier>,
    demo: DemoSeedStore,
    hasher: PasswordHasher,
    pool: Arc<ConnectionPool>,
}

impl std::fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredStore")
            .field("tiers", &self.tier_names())
            .field("demo_users", &self.demo.len())
            .finish()
    }
}

impl TieredStore {
    /// Empty chain. Add tiers in precedence order.
    pub fn new(demo: DemoSeedStore, hasher: PasswordHasher, pool: Arc<ConnectionPool>) -> Self {
        Self {
            tiers: Vec::new(),
            demo,
            hasher,
            pool,
        }
    }

    pub fn with_tier(mut self, store: Arc<dyn UserStore>) -> Self {
        self.tiers.push(Tier { store, breaker: None });
        self
    }

    pub fn with_guarded_tier(mut self, store: Arc<dyn UserStore>, breaker: CircuitBreaker) -> Self {
        self.tiers.push(Tier {
            store,
            breaker: Some(breaker),
        });
        self
    }

    /// Build the precedence chain from configuration.
    ///
    /// A remote that misses its startup ping stays in the chain with its
    /// breaker tripped. Other construction failures are logged and the tier
    /// is left out; only a demo-user hashing failure is fatal.
    pub async fn from_config(config: &AppConfig, pool: Arc<ConnectionPool>) -> StoreResult<Self> {
        let hasher = PasswordHasher::new(config.hashing.cost);
        let demo = DemoSeedStore::new(&config.store.demo_users, hasher)?;
        let mut store = Self::new(demo, hasher, pool.clone());

        if config.store.remote.url.is_some() {
            let remote = RemoteStore::new(
                &config.store.remote,
                config.retries.policy(),
                pool,
                hasher,
            );
            match remote {
                Ok(remote) => {
                    let breaker = CircuitBreaker::new(
                        remote.connection_id().to_string(),
                        config.circuit_breaker.failure_threshold,
                        Duration::from_millis(config.circuit_breaker.reset_timeout_ms),
                    );
                    match remote.ping().await {
                        Ok(()) => remote.track_connection(),
                        Err(e) => {
                            // Kept in the chain; the breaker re-admits it after the reset timeout.
                            tracing::warn!(
                                error = %e,
                                retry_after_ms = config.circuit_breaker.reset_timeout_ms,
                                "Remote tier unreachable at startup, falling back until it recovers"
                            );
                            metrics::record_tier_fallback(crate::store::remote::TIER);
                            breaker.trip();
                        }
                    }
                    store = store.with_guarded_tier(Arc::new(remote), breaker);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Remote tier misconfigured, using local storage");
                    metrics::record_tier_fallback(crate::store::remote::TIER);
                }
            }
        } else {
            tracing::info!("No remote connection string configured, using local storage");
        }

        if let Some(path) = &config.store.data_path {
            match FileStore::open(path, hasher).await {
                Ok(file) => store = store.with_tier(Arc::new(file)),
                Err(e) => {
                    tracing::warn!(
                        path = %path,
                        error = %e,
                        "File tier unavailable, falling back to memory"
                    );
                    metrics::record_tier_fallback(crate::store::file::TIER);
                }
            }
        }

        store = store.with_tier(Arc::new(MemoryStore::new(hasher)));
        tracing::info!(
            tiers = ?store.tier_names(),
            demo_users = store.demo.len(),
            "Store chain ready"
        );
        Ok(store)
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(Tier::name).collect()
    }

    /// Name of the tier new registrations currently land in.
    pub fn primary_tier(&self) -> Option<&'static str> {
        self.tiers.iter().find(|t| t.admit().is_ok()).map(Tier::name)
    }

    /// Look up by email and check the password. `Ok(None)` means the
    /// credentials did not match.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> StoreResult<Option<UserProfile>> {
        let errors = validate_credentials(email, password);
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let Some(user) = self.find_user_by_email(email).await? else {
            tracing::debug!("Login for unknown email");
            metrics::record_auth_attempt("unknown_user");
            return Ok(None);
        };

        if self.verify(password, &user.password_hash).await {
            tracing::info!(user_id = %user.id, "User authenticated");
            metrics::record_auth_attempt("success");
            Ok(Some(user.profile()))
        } else {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            metrics::record_auth_attempt("bad_password");
            Ok(None)
        }
    }

    pub async fn verify(&self, password: &str, hash: &str) -> bool {
        self.hasher.verify_async(password, hash).await
    }

    pub fn status(&self) -> StoreStatus {
        let tiers = self
            .tiers
            .iter()
            .map(|t| TierStatus {
                name: t.name(),
                breaker: t.breaker.as_ref().map(|b| b.state().as_str()),
                failures: t.breaker.as_ref().map(CircuitBreaker::failure_count),
            })
            .collect();
        let pool = self.pool.stats();
        metrics::record_pool_stats(&pool);

        StoreStatus {
            tiers,
            demo_users: self.demo.len(),
            pool,
        }
    }

    fn skipped(&self, tier: &Tier, op: &str, err: &StoreError) {
        tracing::warn!(
            tier = tier.name(),
            operation = op,
            error = %err,
            "Tier failed, trying next"
        );
        metrics::record_tier_fallback(tier.name());
    }
}

#[async_trait]
impl UserStore for TieredStore {
    fn tier(&self) -> &'static str {
        TIER
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> StoreResult<UserRecord> {
        let errors = validate_registration(email, password, name);
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        if self.find_user_by_email(email).await?.is_some() {
            return Err(StoreError::DuplicateEmail(email.trim().to_string()));
        }

        let mut last_err = None;
        for tier in &self.tiers {
            if let Err(e) = tier.admit() {
                self.skipped(tier, "create", &e);
                last_err = Some(e);
                continue;
            }

            let result = tier.store.create_user(email, password, name).await;
            tier.observe(&result);
            match result {
                Ok(record) => return Ok(record),
                Err(e) if e.is_tier_failure() => {
                    self.skipped(tier, "create", &e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| StoreError::unavailable(TIER, "no storage tier configured")))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let mut answered = false;
        let mut last_err = None;

        for tier in &self.tiers {
            if let Err(e) = tier.admit() {
                self.skipped(tier, "find_by_email", &e);
                last_err = Some(e);
                continue;
            }

            let result = tier.store.find_user_by_email(email).await;
            tier.observe(&result);
            match result {
                Ok(Some(user)) => return Ok(Some(user)),
                Ok(None) => answered = true,
                Err(e) => {
                    self.skipped(tier, "find_by_email", &e);
                    last_err = Some(e);
                }
            }
        }

        if let Some(user) = self.demo.find_user_by_email(email).await? {
            return Ok(Some(user));
        }

        match last_err {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<UserRecord>> {
        let mut answered = false;
        let mut last_err = None;

        for tier in &self.tiers {
            if let Err(e) = tier.admit() {
                self.skipped(tier, "find_by_id", &e);
                last_err = Some(e);
                continue;
            }

            let result = tier.store.find_user_by_id(id).await;
            tier.observe(&result);
            match result {
                Ok(Some(user)) => return Ok(Some(user)),
                Ok(None) => answered = true,
                Err(e) => {
                    self.skipped(tier, "find_by_id", &e);
                    last_err = Some(e);
                }
            }
        }

        if let Some(user) = self.demo.find_user_by_id(id).await? {
            return Ok(Some(user));
        }

        match last_err {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }
}
