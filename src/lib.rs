//! Static content server library.
//!
//! Every request runs through a fixed interceptor pipeline (logging,
//! headers, access control, rate limiting, authentication, CORS, path
//! safety, compression, caching) before the resolver maps it onto the
//! document root.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resolver;
pub mod security;

pub use config::ServeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
