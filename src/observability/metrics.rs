//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hireme_store_operations_total` (counter): by tier, operation, outcome
//! - `hireme_store_operation_duration_seconds` (histogram): by tier, operation
//! - `hireme_tier_fallbacks_total` (counter): by the tier that was skipped
//! - `hireme_retries_total` (counter): by operation label
//! - `hireme_circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `hireme_pool_connections` / `hireme_pool_healthy_connections` (gauges)
//! - `hireme_auth_attempts_total` (counter): by outcome
//! - `hireme_rate_limited_total` (counter): rejected requests by scope
//!
//! Recording is a no-op until an exporter is installed, so library code and
//! tests call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::pool::PoolStats;

pub const STORE_OPERATIONS_TOTAL: &str = "hireme_store_operations_total";
pub const STORE_OPERATION_DURATION_SECONDS: &str = "hireme_store_operation_duration_seconds";
pub const TIER_FALLBACKS_TOTAL: &str = "hireme_tier_fallbacks_total";
pub const RETRIES_TOTAL: &str = "hireme_retries_total";
pub const CIRCUIT_BREAKER_STATE: &str = "hireme_circuit_breaker_state";
pub const POOL_CONNECTIONS: &str = "hireme_pool_connections";
pub const POOL_HEALTHY_CONNECTIONS: &str = "hireme_pool_healthy_connections";
pub const AUTH_ATTEMPTS_TOTAL: &str = "hireme_auth_attempts_total";
pub const RATE_LIMITED_TOTAL: &str = "hireme_rate_limited_total";

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_store_operation(
    tier: &'static str,
    operation: &'static str,
    outcome: &'static str,
    start: Instant,
) {
    counter!(
        STORE_OPERATIONS_TOTAL,
        "tier" => tier,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    histogram!(STORE_OPERATION_DURATION_SECONDS, "tier" => tier, "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_tier_fallback(tier: &'static str) {
    counter!(TIER_FALLBACKS_TOTAL, "tier" => tier).increment(1);
}

pub fn record_retry(label: &str) {
    counter!(RETRIES_TOTAL, "operation" => label.to_string()).increment(1);
}

pub fn record_breaker_state(name: &str, state: CircuitState) {
    gauge!(CIRCUIT_BREAKER_STATE, "breaker" => name.to_string()).set(state as u8 as f64);
}

pub fn record_pool_stats(stats: &PoolStats) {
    gauge!(POOL_CONNECTIONS).set(stats.total as f64);
    gauge!(POOL_HEALTHY_CONNECTIONS).set(stats.healthy as f64);
}

pub fn record_auth_attempt(outcome: &'static str) {
    counter!(AUTH_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_rate_limited(scope: &'static str) {
    counter!(RATE_LIMITED_TOTAL, "scope" => scope).increment(1);
}
