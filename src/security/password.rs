//! Password hashing utilities.

use std::fmt;

/// Lowest bcrypt cost accepted by the underlying primitive.
pub const MIN_COST: u32 = 4;
/// Highest bcrypt cost accepted by the underlying primitive.
pub const MAX_COST: u32 = 31;

/// Hashing failure. Only raised for an out-of-range cost or a crashed worker.
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Salted, cost-parameterized password hasher backed by bcrypt.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher").field("cost", &self.cost).finish()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash `plaintext` with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| HashError(e.to_string()))
    }

    /// Check `plaintext` against a stored hash. Malformed hashes verify as
    /// `false` instead of erroring.
    pub fn verify(&self, plaintext: &str, hashed: &str) -> bool {
        verify_password(plaintext, hashed)
    }

    /// [`hash`](Self::hash) on the blocking pool so async callers do not
    /// stall the runtime for the duration of the work factor.
    pub async fn hash_async(&self, plaintext: &str) -> Result<String, HashError> {
        let hasher = *self;
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| HashError(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_async(&self, plaintext: &str, hashed: &str) -> bool {
        let plaintext = plaintext.to_owned();
        let hashed = hashed.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&plaintext, &hashed))
            .await
            .unwrap_or(false)
    }
}

/// Verify a password against a bcrypt hash. Comparison is constant-time
/// inside the primitive.
pub fn verify_password(plaintext: &str, hashed: &str) -> bool {
    bcrypt::verify(plaintext, hashed).unwrap_or(false)
}
