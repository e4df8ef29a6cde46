//! Store error types.

use crate::security::HashError;

/// Errors produced by user store tiers and the tiered facade.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with this normalized email already exists.
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    /// The tier's underlying I/O failed (disk, network, timeout).
    #[error("{tier} tier unavailable: {reason}")]
    BackendUnavailable { tier: &'static str, reason: String },

    /// The backend answered but refused the request (bad credentials,
    /// malformed action). Retrying cannot help.
    #[error("{tier} tier rejected request: {reason}")]
    Rejected { tier: &'static str, reason: String },

    /// Malformed input rejected before any tier was touched.
    #[error("invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Hashing(#[from] HashError),

    /// The tier's circuit breaker is open.
    #[error("{0} tier skipped: circuit breaker open")]
    CircuitOpen(&'static str),

    /// The tier does not accept writes.
    #[error("{0} tier is read-only")]
    ReadOnly(&'static str),
}

impl StoreError {
    /// Create a backend error from any displayable error.
    pub fn unavailable<E: std::fmt::Display>(tier: &'static str, err: E) -> Self {
        Self::BackendUnavailable {
            tier,
            reason: err.to_string(),
        }
    }

    /// Only transient backend failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::BackendUnavailable { .. })
    }

    /// Whether the backend itself misbehaved. Counted by circuit breakers.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            StoreError::BackendUnavailable { .. } | StoreError::Rejected { .. }
        )
    }

    /// Whether the facade should move on to the next tier.
    pub fn is_tier_failure(&self) -> bool {
        matches!(
            self,
            StoreError::BackendUnavailable { .. }
                | StoreError::Rejected { .. }
                | StoreError::CircuitOpen(_)
                | StoreError::ReadOnly(_)
        )
    }
}

/// Store result alias.
pub type StoreResult<T> = Result<T, StoreError>;
