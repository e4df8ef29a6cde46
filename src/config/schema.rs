//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::backoff::BackoffConfig;
use crate::resilience::retries::RetryPolicy;

/// Root configuration for the credential service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment; controls error detail and HSTS.
    pub environment: Environment,

    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Storage tier configuration.
    pub store: StoreConfig,

    /// Password hashing settings.
    pub hashing: HashingConfig,

    /// Retry configuration for remote calls.
    pub retries: RetryConfig,

    /// Circuit breaker guarding the remote tier.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Connection pool bookkeeping.
    pub pool: PoolConfig,

    /// Per-client limit on the auth endpoints.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Storage tier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON users file. `None` disables the file tier.
    pub data_path: Option<String>,

    /// Remote document store settings. The tier is only attempted when
    /// `remote.url` is set.
    pub remote: RemoteStoreConfig,

    /// Seed users consulted as a last resort for lookups.
    pub demo_users: Vec<DemoUserConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_path: Some("data/users.json".to_string()),
            remote: RemoteStoreConfig::default(),
            demo_users: Vec::new(),
        }
    }
}

/// Remote document store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteStoreConfig {
    /// Base URL of the document API (the connection string).
    pub url: Option<String>,

    /// API key sent in the `api-key` header.
    pub api_key: Option<String>,

    /// Data source (cluster) name.
    pub data_source: String,

    /// Database name.
    pub database: String,

    /// Collection holding user documents.
    pub collection: String,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            data_source: "Cluster0".to_string(),
            database: "hireme-ai".to_string(),
            collection: "users".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl RemoteStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A demo account available without registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoUserConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Password hashing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HashingConfig {
    /// bcrypt work factor.
    pub cost: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self { cost: 12 }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per operation (1 disables retrying).
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Growth factor applied per attempt.
    pub multiplier: f64,

    /// Upper bound on the pre-jitter delay in milliseconds.
    pub max_delay_ms: u64,

    /// Jitter applied to each delay, in percent of the delay.
    pub jitter_percent: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 5_000,
            jitter_percent: 10,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: BackoffConfig {
                initial_delay_ms: self.initial_delay_ms,
                multiplier: self.multiplier,
                max_delay_ms: self.max_delay_ms,
                jitter_percent: self.jitter_percent,
            },
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Cooldown after the last failure before a probe is allowed.
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
        }
    }
}

/// Connection pool bookkeeping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum tracked connections.
    pub max_connections: usize,

    /// Sweep interval in seconds.
    pub health_check_interval_secs: u64,

    /// Entries idle longer than this are evicted.
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            health_check_interval_secs: 30,
            idle_timeout_secs: 5 * 60,
        }
    }
}

/// Fixed-window rate limit applied to `/api/auth/*`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,

    /// Requests allowed per client per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window_secs: 15 * 60,
            trust_proxy_headers: false,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format: "pretty" or "compact".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
