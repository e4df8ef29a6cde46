//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the connection pool tracker and the tier chain from configuration
//! - Start background tasks (pool sweeper)
//!
//! # Design Decisions
//! - Tier chain is built once here; nothing re-selects tiers per request
//! - Tier failures at startup degrade the chain instead of aborting
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::resilience::pool::ConnectionPool;
use crate::store::{StoreError, TieredStore};

/// Error type for startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Shared services assembled at startup.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub store: Arc<TieredStore>,
    pub pool: Arc<ConnectionPool>,
}

/// Build the pool tracker and the store chain.
pub async fn build_state(config: &AppConfig) -> Result<AppServices, StartupError> {
    let pool = Arc::new(ConnectionPool::new(
        config.pool.max_connections,
        Duration::from_secs(config.pool.idle_timeout_secs),
    ));
    let store = TieredStore::from_config(config, pool.clone()).await?;

    tracing::info!(
        environment = ?config.environment,
        tiers = ?store.tier_names(),
        hash_cost = config.hashing.cost,
        "Services initialized"
    );

    Ok(AppServices {
        store: Arc::new(store),
        pool,
    })
}

/// Spawn the pool sweeper, stopping on `shutdown`.
pub fn spawn_pool_sweeper(
    pool: Arc<ConnectionPool>,
    config: &AppConfig,
    shutdown: &Shutdown,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(config.pool.health_check_interval_secs.max(1));
    let rx = shutdown.subscribe();
    tokio::spawn(async move { pool.run(interval, rx).await })
}

/// Bind the listener configured in `listener.bind_address`.
pub async fn bind(config: &AppConfig) -> Result<tokio::net::TcpListener, StartupError> {
    let address = config.listener.bind_address.clone();
    tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}
