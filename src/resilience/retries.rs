//! Retry logic.
//!
//! # Responsibilities
//! - Execute a fallible async operation with exponential backoff + jitter
//! - Stop after `max_retries` total attempts and re-raise the last error
//! - Skip retries for errors the caller marks as deterministic
//!
//! # Design Decisions
//! - Strictly sequential: no hedged or concurrent attempts
//! - Every retry is logged with attempt number and delay
//! - No cancellation: a caller waits for the whole sequence

use std::fmt::Display;
use std::future::Future;

use crate::observability::metrics;
use crate::resilience::backoff::{jittered_backoff, BackoffConfig};

/// Retry policy: attempt budget plus backoff shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_retries: u32,
    pub backoff: BackoffConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }
}

/// Run `op` until it succeeds or the attempt budget is spent.
pub async fn execute_with_retry<T, E, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    execute_with_retry_when(label, policy, |_| true, op).await
}

/// Like [`execute_with_retry`], but errors for which `should_retry` returns
/// false are returned immediately.
pub async fn execute_with_retry_when<T, E, F, Fut, P>(
    label: &str,
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 1;

    loop {
        tracing::debug!(operation = %label, attempt, max_attempts, "Attempting operation");

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = %label,
                        attempts = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts || !should_retry(&e) => {
                if attempt >= max_attempts && max_attempts > 1 {
                    tracing::error!(
                        operation = %label,
                        attempts = attempt,
                        error = %e,
                        "Operation failed after all attempts"
                    );
                }
                return Err(e);
            }
            Err(e) => {
                let delay = jittered_backoff(attempt, &policy.backoff);
                tracing::warn!(
                    operation = %label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                metrics::record_retry(label);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: BackoffConfig {
                initial_delay_ms: 1,
                multiplier: 2.0,
                max_delay_ms: 5,
                jitter_percent: 10,
            },
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<&str, String> = execute_with_retry("flaky", &fast_policy(3), || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), String> = execute_with_retry("down", &fast_policy(4), || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {}", n))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "failure 4");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_error_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), String> = execute_with_retry_when(
            "dup",
            &fast_policy(5),
            |e: &String| e != "duplicate",
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("duplicate".to_string())
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let _: Result<(), String> = execute_with_retry("once", &fast_policy(0), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("nope".to_string())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
