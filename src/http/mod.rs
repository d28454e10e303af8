//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup: timeout, request ID, tracing)
//!     → pipeline.rs (interceptors in canonical order)
//!         access_log → security/custom headers → ip filter → rate limit
//!         → basic auth → cors → path normalizer → hidden files
//!         → compression → cache control
//!     → runtime_config.rs | resolver
//!     → Send to client
//! ```

pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod runtime_config;
pub mod server;

pub use pipeline::{Handler, Interceptor, Next, Pipeline, PipelineBuilder};
pub use request::{CanonicalPath, X_REQUEST_ID};
pub use server::{build_pipeline, HttpServer};
