//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a remote tier:
//!     → circuit_breaker.rs (skip the tier while open)
//!     → retries.rs (sequential attempts, backoff.rs delays between them)
//!     → timeouts.rs (deadline on each attempt)
//!     → outcome recorded on the breaker and in pool.rs bookkeeping
//! ```
//!
//! # Design Decisions
//! - Primitives are generic; nothing here knows about users or tiers
//! - Breaker and pool state live in the instance that owns them, never in globals
//! - Deterministic failures (duplicates, bad input) are never retried

pub mod backoff;
pub mod circuit_breaker;
pub mod pool;
pub mod retries;
pub mod timeouts;

pub use backoff::{add_jitter, calculate_backoff, jittered_backoff, BackoffConfig};
pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitState};
pub use pool::{ConnectionPool, PoolStats};
pub use retries::{execute_with_retry, execute_with_retry_when, RetryPolicy};
pub use timeouts::{with_timeout, Elapsed};
