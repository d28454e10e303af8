//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (interceptors, resolver):
//!     → logging.rs (LogSink: access records, errors)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout / log file via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{AccessRecord, LogSink, TracingSink};
