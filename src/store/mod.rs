//! User storage subsystem.
//!
//! # Data Flow
//! ```text
//! Route handler
//!     → tiered.rs (validate, duplicate check across the chain)
//!     → remote.rs   [breaker → retry → timeout → document API]
//!     → file.rs     [mutex → read → modify → temp write → rename]
//!     → memory.rs   [RwLock<Vec<UserRecord>>]
//!     → demo.rs     [read-only seed users, lookups only]
//! ```
//!
//! # Design Decisions
//! - Every tier implements the same [`UserStore`] contract
//! - The precedence chain is fixed at startup, never per call
//! - All state is owned by store instances; nothing is process-global
//! - Emails compare case-insensitively after trimming

pub mod demo;
pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod remote;
pub mod tiered;
pub mod traits;

pub use demo::DemoSeedStore;
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::{normalize_email, UserProfile, UserRecord};
pub use remote::RemoteStore;
pub use tiered::{StoreStatus, TierStatus, TieredStore};
pub use traits::UserStore;
