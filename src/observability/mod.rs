//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log collection
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never interpolated secrets: emails are logged,
//!   passwords and hashes never are
//! - Request ID flows through the HTTP layer
//! - Metrics are cheap no-ops when no exporter is installed

pub mod logging;
pub mod metrics;
