//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{
    BasicAuthConfig, CorsConfig, RateLimitConfig, RuntimeConfigConfig, ServeConfig,
};
use crate::config::validation::{normalize_config, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a configuration file without validating it.
///
/// A missing file yields the defaults. Files ending in `.toml` are parsed as
/// TOML, everything else as JSON. Omitted fields keep their default values.
pub fn read_config(path: &Path) -> Result<ServeConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(ServeConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config = if is_toml {
        toml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(config)
}

/// Load, normalize and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<ServeConfig, ConfigError> {
    let mut config = read_config(path)?;
    normalize_config(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Write a configuration as pretty-printed JSON.
pub fn save_config(path: &Path, config: &ServeConfig) -> Result<(), ConfigError> {
    let mut content = serde_json::to_string_pretty(config)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

/// Defaults with every optional section present but disabled, so a
/// generated file shows all available settings.
pub fn example_config() -> ServeConfig {
    let mut config = ServeConfig::default();
    config.security.basic_auth = Some(BasicAuthConfig {
        enabled: false,
        username: "admin".to_string(),
        password: "change-me".to_string(),
        realm: "Restricted".to_string(),
    });
    config.security.cors = Some(CorsConfig {
        enabled: false,
        allowed_origins: vec!["*".to_string()],
        allowed_methods: ["GET", "HEAD", "OPTIONS"].map(String::from).to_vec(),
        allowed_headers: vec!["Content-Type".to_string()],
        allow_credentials: false,
        max_age: 3600,
    });
    config.security.rate_limit = Some(RateLimitConfig::default());
    config.runtime_config = Some(RuntimeConfigConfig {
        enabled: false,
        route: "/runtime-config.js".to_string(),
        format: "js".to_string(),
        var_name: "APP_CONFIG".to_string(),
        env_prefix: "APP_".to_string(),
        env_variables: Vec::new(),
        no_cache: true,
    });
    config
}
