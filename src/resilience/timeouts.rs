//! Timeout enforcement.
//!
//! Every remote call gets a deadline. A timed-out call is reported as a
//! distinct error so callers can treat it as the dependency being unavailable.

use std::future::Future;
use std::time::Duration;

/// Returned when an operation exceeds its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation timed out after {0:?}")]
pub struct Elapsed(pub Duration);

/// Await `fut`, giving up after `duration`.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| Elapsed(duration))
}
