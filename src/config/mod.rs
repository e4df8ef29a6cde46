//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (DOCUMENT_STORE_URL, USERS_FILE, APP_ENV)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → consumed once at startup to build the tier chain
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the tier chain is fixed at startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AppConfig, CircuitBreakerConfig, DemoUserConfig, Environment, HashingConfig,
    ListenerConfig, ObservabilityConfig, PoolConfig, RateLimitConfig, RemoteStoreConfig,
    RetryConfig, StoreConfig,
};
