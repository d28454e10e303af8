//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that referenced files and directories exist
//! - Validate value ranges (port, header syntax)
//! - Coerce soft settings to safe values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ServeConfig → Result<(), Vec<ValidationError>>
//! - Normalization never fails; it runs before validation

use std::path::Path;

use axum::http::{HeaderName, HeaderValue};

use crate::config::schema::ServeConfig;

const DEFAULT_REALM: &str = "Restricted";
const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid port: {0} (must be between 1-65535)")]
    InvalidPort(u32),

    #[error("root directory error: {0}")]
    RootDir(String),

    #[error("root path is not a directory: {0}")]
    RootNotDirectory(String),

    #[error("HTTPS enabled but cert_file or key_file not specified")]
    MissingTlsFiles,

    #[error("certificate file not found: {0}")]
    CertNotFound(String),

    #[error("key file not found: {0}")]
    KeyNotFound(String),

    #[error("basic auth enabled but username or password not specified")]
    MissingCredentials,

    #[error("invalid custom header: {0}")]
    InvalidHeader(String),
}

/// Coerce soft settings to their safe defaults.
pub fn normalize_config(config: &mut ServeConfig) {
    if let Some(auth) = config.security.basic_auth.as_mut() {
        if auth.enabled && auth.realm.is_empty() {
            auth.realm = DEFAULT_REALM.to_string();
        }
    }

    let level = config.performance.compression_level;
    if !(1..=9).contains(&level) {
        config.performance.compression_level = DEFAULT_COMPRESSION_LEVEL;
    }

    let log_level = config.logging.level.to_ascii_lowercase();
    config.logging.level = if LOG_LEVELS.contains(&log_level.as_str()) {
        log_level
    } else {
        "info".to_string()
    };
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !(1..=65535).contains(&config.server.port) {
        errors.push(ValidationError::InvalidPort(config.server.port));
    }

    let root = &config.server.root_dir;
    match std::fs::metadata(root) {
        Ok(meta) if !meta.is_dir() => errors.push(ValidationError::RootNotDirectory(root.clone())),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::RootDir(format!("{root}: {e}"))),
    }

    let security = &config.security;
    if security.enable_https {
        if security.cert_file.is_empty() || security.key_file.is_empty() {
            errors.push(ValidationError::MissingTlsFiles);
        } else {
            if !Path::new(&security.cert_file).exists() {
                errors.push(ValidationError::CertNotFound(security.cert_file.clone()));
            }
            if !Path::new(&security.key_file).exists() {
                errors.push(ValidationError::KeyNotFound(security.key_file.clone()));
            }
        }
    }

    if let Some(auth) = &security.basic_auth {
        if auth.enabled && (auth.username.is_empty() || auth.password.is_empty()) {
            errors.push(ValidationError::MissingCredentials);
        }
    }

    for (name, value) in &config.performance.custom_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeader(name.clone()));
        } else if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeader(format!("{name}: {value}")));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
