//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, callers skip it
//! - Half-Open: the cooldown has elapsed, one probe is allowed
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: reset timeout elapsed since last failure (observed by is_open)
//! Half-Open → Closed: success recorded, failure count reset to 0
//! Half-Open → Open: failure recorded (count was never reset)
//! Any → Open: trip() (dependency known to be down, e.g. failed startup check)
//! ```
//!
//! The breaker does not intercept calls on its own. Callers gate on
//! [`CircuitBreaker::is_open`] or go through [`CircuitBreaker::call`].

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use crate::observability::metrics;

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(val: u8) -> Self {
        match val {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`CircuitBreaker::call`].
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    #[error("circuit breaker '{0}' is open")]
    Open(String),
    #[error(transparent)]
    Inner(E),
}

/// Consecutive-failure circuit breaker for one protected dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    reset_timeout: Duration,
    state: AtomicU8,
    failure_count: AtomicU32,
    /// Milliseconds since `epoch` of the last failure.
    last_failure_ms: AtomicU64,
    epoch: Instant,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Acquire)
    }

    fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn transition(&self, to: CircuitState) {
        self.state.store(to as u8, Ordering::Release);
        metrics::record_breaker_state(&self.name, to);
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
        self.last_failure_ms.store(self.elapsed_ms(), Ordering::Release);

        if failures >= self.failure_threshold && self.state() != CircuitState::Open {
            self.transition(CircuitState::Open);
            tracing::warn!(
                breaker = %self.name,
                failures,
                threshold = self.failure_threshold,
                "Circuit breaker OPEN: too many failures"
            );
        }
    }

    /// Record a successful call. Only meaningful while half-open.
    pub fn record_success(&self) {
        if self
            .state
            .compare_exchange(
                CircuitState::HalfOpen as u8,
                CircuitState::Closed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.failure_count.store(0, Ordering::Release);
            metrics::record_breaker_state(&self.name, CircuitState::Closed);
            tracing::info!(breaker = %self.name, "Circuit breaker CLOSED: dependency restored");
        }
    }

    /// Gate check. Moves Open → Half-Open once the reset timeout has elapsed
    /// since the last failure, returning `false` to admit a probe.
    pub fn is_open(&self) -> bool {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let since = self
                    .elapsed_ms()
                    .saturating_sub(self.last_failure_ms.load(Ordering::Acquire));
                if since > self.reset_timeout.as_millis() as u64 {
                    if self
                        .state
                        .compare_exchange(
                            CircuitState::Open as u8,
                            CircuitState::HalfOpen as u8,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        )
                        .is_ok()
                    {
                        metrics::record_breaker_state(&self.name, CircuitState::HalfOpen);
                        tracing::info!(
                            breaker = %self.name,
                            "Circuit breaker HALF-OPEN: attempting recovery"
                        );
                    }
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Force the breaker open as if the threshold had just been reached.
    /// The reset timeout starts now.
    pub fn trip(&self) {
        self.failure_count.store(self.failure_threshold, Ordering::Release);
        self.last_failure_ms.store(self.elapsed_ms(), Ordering::Release);
        self.transition(CircuitState::Open);
        tracing::warn!(breaker = %self.name, "Circuit breaker OPEN: tripped");
    }

    /// Force the breaker back to closed with a clean history.
    pub fn reset(&self) {
        self.failure_count.store(0, Ordering::Release);
        self.last_failure_ms.store(0, Ordering::Release);
        self.transition(CircuitState::Closed);
    }

    /// Run `op` behind the gate, recording its outcome.
    pub async fn call<T, E, F, Fut>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.is_open() {
            return Err(BreakerError::Open(self.name.clone()));
        }

        match op().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let cb = CircuitBreaker::new("db", 3, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert!(!cb.is_open());
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert!(cb.is_open());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_half_open_then_closed() {
        let cb = CircuitBreaker::new("db", 2, Duration::from_millis(20));
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_open());

        std::thread::sleep(Duration::from_millis(40));
        assert!(!cb.is_open());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_failure_while_half_open_reopens() {
        let cb = CircuitBreaker::new("db", 2, Duration::from_millis(20));
        cb.record_failure();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cb.is_open());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.is_open());
    }

    #[test]
    fn test_success_while_closed_is_noop() {
        let cb = CircuitBreaker::new("db", 3, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.failure_count(), 2);
        cb.record_failure();
        assert!(cb.is_open());
    }

    #[test]
    fn test_reset() {
        let cb = CircuitBreaker::new("db", 1, Duration::from_secs(60));
        cb.record_failure();
        assert!(cb.is_open());
        cb.reset();
        assert!(!cb.is_open());
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_trip_opens_until_reset_timeout() {
        let cb = CircuitBreaker::new("remote", 5, Duration::from_millis(20));
        cb.trip();
        assert!(cb.is_open());
        assert_eq!(cb.failure_count(), 5);

        std::thread::sleep(Duration::from_millis(40));
        assert!(!cb.is_open());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_call_skips_operation_when_open() {
        let cb = CircuitBreaker::new("remote", 1, Duration::from_secs(60));
        let first: Result<(), _> = cb.call(|| async { Err::<(), _>("boom") }).await;
        assert!(matches!(first, Err(BreakerError::Inner("boom"))));

        let mut ran = false;
        let second: Result<(), BreakerError<&str>> = cb
            .call(|| {
                ran = true;
                async { Ok(()) }
            })
            .await;
        assert!(matches!(second, Err(BreakerError::Open(_))));
        assert!(!ran);
    }
}
