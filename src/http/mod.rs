//! HTTP route layer.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace, timeout, body limit, security headers)
//!     → security::rate_limit (auth routes only)
//!     → request.rs (JSON payloads)
//!     → handlers.rs (register / login / user / health)
//!     → TieredStore
//!     → response.rs (user envelope or JSON error envelope)
//! ```
//!
//! # Routes
//! - `POST /api/auth/register` → 201 / 400 / 409 / 429 / 500
//! - `POST /api/auth/login` → 200 / 400 / 401 / 429 / 500
//! - `GET /api/users/{id}` → 200 / 404
//! - `GET /health` → 200 with tier chain, breaker and pool status

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, ErrorCode};
pub use server::{AppState, HttpServer};
