//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files, and
//! every section falls back to its `Default` when omitted.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the static server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServeConfig {
    /// Listener and document root.
    pub server: ServerConfig,

    /// Access control, authentication, CORS and rate limiting.
    pub security: SecurityConfig,

    /// Compression, caching and header injection.
    pub performance: PerformanceConfig,

    /// Log sink behaviour.
    pub logging: LoggingConfig,

    /// Resolver features (listing, index files, SPA, error pages).
    pub features: FeaturesConfig,

    /// Environment-driven runtime configuration endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_config: Option<RuntimeConfigConfig>,

    /// Metrics exporter settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port to bind.
    pub port: u32,

    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Directory served as the document root.
    pub root_dir: String,

    /// Read timeout in seconds.
    pub read_timeout: u64,

    /// Write timeout in seconds.
    pub write_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            root_dir: ".".to_string(),
            read_timeout: 30,
            write_timeout: 30,
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Deadline for producing a response head, or `None` when both timeouts are zero.
    pub fn request_timeout(&self) -> Option<Duration> {
        let secs = self.read_timeout.saturating_add(self.write_timeout);
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Serve over TLS.
    pub enable_https: bool,

    /// Path to certificate file (PEM).
    pub cert_file: String,

    /// Path to private key file (PEM).
    pub key_file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuthConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,

    /// Client addresses allowed to connect. Empty means no restriction.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_whitelist: Vec<String>,

    /// Client addresses always rejected.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_blacklist: Vec<String>,

    /// Reject any path segment starting with a dot.
    pub block_hidden_files: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_https: false,
            cert_file: String::new(),
            key_file: String::new(),
            basic_auth: None,
            cors: None,
            rate_limit: None,
            ip_whitelist: Vec::new(),
            ip_blacklist: Vec::new(),
            block_hidden_files: true,
        }
    }
}

/// HTTP basic authentication.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BasicAuthConfig {
    pub enabled: bool,
    pub username: String,
    pub password: String,
    /// Realm announced in the `WWW-Authenticate` challenge.
    pub realm: String,
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Exact origins, or the single entry `"*"`.
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds (0 = not sent).
    pub max_age: u64,
}

/// Per-client token bucket settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Tokens refilled per minute for each client.
    pub requests_per_ip: i64,

    /// Bucket capacity. Falls back to `requests_per_ip` when not positive.
    pub burst_size: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_ip: 60,
            burst_size: 0,
        }
    }
}

impl RateLimitConfig {
    /// Bucket capacity, never below one.
    pub fn capacity(&self) -> u64 {
        if self.burst_size > 0 {
            self.burst_size as u64
        } else if self.requests_per_ip > 0 {
            self.requests_per_ip as u64
        } else {
            1
        }
    }

    /// Refill rate in tokens per minute, never negative.
    pub fn refill_per_minute(&self) -> u64 {
        self.requests_per_ip.max(0) as u64
    }
}

/// Performance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub enable_compression: bool,

    /// Gzip level, 1-9.
    pub compression_level: u32,

    /// Emit `Cache-Control` headers.
    pub enable_cache: bool,

    /// `max-age` in seconds.
    pub cache_max_age: u64,

    /// Emit validators and answer conditional requests.
    pub enable_etags: bool,

    /// Headers added to every response.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_headers: BTreeMap<String, String>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_compression: true,
            compression_level: 6,
            enable_cache: true,
            cache_max_age: 3600,
            enable_etags: true,
            custom_headers: BTreeMap::new(),
        }
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,

    /// debug, info, warn or error.
    pub level: String,

    pub access_log: bool,
    pub error_log: bool,

    /// Optional file that receives a copy of every log line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    pub color_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            access_log: true,
            error_log: true,
            log_file: None,
            color_output: true,
        }
    }
}

/// Resolver features.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub directory_listing: bool,

    /// Candidate index files, tried in order.
    pub index_files: Vec<String>,

    /// Serve `spa_index` for paths that do not exist.
    pub spa_mode: bool,
    pub spa_index: String,

    /// Status code (as string) to a file path relative to the root.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub custom_error_pages: HashMap<String, String>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            directory_listing: false,
            index_files: vec!["index.html".to_string(), "index.htm".to_string()],
            spa_mode: false,
            spa_index: "index.html".to_string(),
            custom_error_pages: HashMap::new(),
        }
    }
}

/// Runtime configuration endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuntimeConfigConfig {
    pub enabled: bool,

    /// Route where the config is served (default: /runtime-config.js).
    pub route: String,

    /// "js" or "json" (default: js).
    pub format: String,

    /// JavaScript global name (default: APP_CONFIG).
    pub var_name: String,

    /// Prefix selecting environment variables; stripped from the output keys.
    pub env_prefix: String,

    /// Explicit variable list, takes precedence over the prefix.
    pub env_variables: Vec<String>,

    /// Add no-cache headers.
    pub no_cache: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
