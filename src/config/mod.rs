//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML) + CLI overrides
//!     → loader.rs (parse & deserialize onto defaults)
//!     → validation.rs (normalize soft settings, semantic checks)
//!     → ServeConfig (validated, immutable)
//!     → consumed once at startup to build the pipeline
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the interceptor chain is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{example_config, load_config, read_config, save_config, ConfigError};
pub use schema::{
    BasicAuthConfig, CorsConfig, FeaturesConfig, LoggingConfig, ObservabilityConfig,
    PerformanceConfig, RateLimitConfig, RuntimeConfigConfig, SecurityConfig, ServeConfig,
    ServerConfig,
};
pub use validation::{normalize_config, validate_config, ValidationError};
