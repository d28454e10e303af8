//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (deny list, then allow list)
//!     → rate_limit.rs (per-client token bucket)
//!     → auth.rs (Basic credentials, constant-time compare)
//!     → cors.rs (origin policy, preflight short-circuit)
//!     → path.rs (normalize, reject traversal, reject hidden segments)
//!     → Pass to the resolver
//!
//! Outgoing response:
//!     ← headers.rs (security + custom headers, insert-if-absent)
//! ```
//!
//! # Design Decisions
//! - Defense in depth: path checks here, containment again in the resolver
//! - Fail closed: an unknown client address is rejected, never allowed
//! - No trust in client input

pub mod access_control;
pub mod auth;
pub mod cors;
pub mod headers;
pub mod path;
pub mod rate_limit;

pub use access_control::{client_key, FilterDecision, IpFilter, IpFilterInterceptor};
pub use auth::BasicAuthInterceptor;
pub use cors::{CorsInterceptor, CorsPolicy};
pub use headers::HeaderInjector;
pub use path::{HiddenFileBlocker, PathNormalizer};
pub use rate_limit::{RateLimitInterceptor, RateLimiter};
