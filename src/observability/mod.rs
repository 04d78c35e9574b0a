//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Per forwarded request:
//!     → access_log.rs (JSON record, posted on a detached task)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Log sink (HTTP POST per backend)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through spans and headers
//! - Access-log delivery never delays a response

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::{AccessLogger, AccessRecord};
