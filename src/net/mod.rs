//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → axum::serve (plain HTTP) | axum-server + rustls (HTTPS, tls.rs)
//!     → ConnectInfo<SocketAddr> recorded for the interceptors
//!     → Hand off to HTTP layer
//! ```

pub mod tls;

pub use tls::{load_tls_config, validate_pem_files, TlsError};
