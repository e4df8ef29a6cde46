//! Security subsystem.
//!
//! # Responsibilities
//! - Password hashing and verification (bcrypt, configurable work factor)
//! - Input validation before any storage tier is touched
//! - Security headers on every HTTP response
//! - Per-client rate limiting of the auth endpoints
//!
//! # Design Decisions
//! - Plaintext passwords and hashes are never logged
//! - Verification never errors; a malformed hash simply does not match
//! - Hashing runs on the blocking pool when called from async code

pub mod headers;
pub mod password;
pub mod rate_limit;
pub mod validation;

pub use password::{verify_password, HashError, PasswordHasher};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
