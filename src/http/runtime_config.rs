//! Runtime configuration endpoint.
//!
//! Exposes selected environment variables to browser code, either as a
//! JavaScript assignment (`window.APP_CONFIG = {...};`) or as plain JSON.

use std::collections::BTreeMap;
use std::ffi::OsString;

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};

use crate::config::RuntimeConfigConfig;

pub const DEFAULT_ROUTE: &str = "/runtime-config.js";
pub const DEFAULT_VAR_NAME: &str = "APP_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    JavaScript,
    Json,
}

/// The configured endpoint, with defaults filled in.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    route: String,
    format: OutputFormat,
    var_name: String,
    env_prefix: String,
    env_variables: Vec<String>,
    no_cache: bool,
}

impl RuntimeConfig {
    /// `None` unless the endpoint is enabled.
    pub fn from_config(config: Option<&RuntimeConfigConfig>) -> Option<Self> {
        let config = config.filter(|c| c.enabled)?;
        let or_default = |value: &str, default: &str| {
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };
        Some(Self {
            route: or_default(&config.route, DEFAULT_ROUTE),
            format: if config.format == "json" {
                OutputFormat::Json
            } else {
                OutputFormat::JavaScript
            },
            var_name: or_default(&config.var_name, DEFAULT_VAR_NAME),
            env_prefix: config.env_prefix.clone(),
            env_variables: config.env_variables.clone(),
            no_cache: config.no_cache,
        })
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn matches(&self, path: &str) -> bool {
        path == self.route
    }

    /// Select variables from `env`.
    ///
    /// An explicit list wins: each listed, non-empty variable is kept under its
    /// own name. Otherwise variables carrying the prefix are kept with the
    /// prefix stripped. With neither, the result is empty.
    pub fn collect(&self, env: impl IntoIterator<Item = (String, String)>) -> BTreeMap<String, String> {
        if !self.env_variables.is_empty() {
            return env
                .into_iter()
                .filter(|(key, value)| !value.is_empty() && self.env_variables.contains(key))
                .collect();
        }
        if self.env_prefix.is_empty() {
            return BTreeMap::new();
        }
        env.into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&self.env_prefix)
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect()
    }

    /// Render the endpoint body for the current process environment.
    pub fn respond(&self) -> Result<Response<Body>, serde_json::Error> {
        self.render(&self.collect(unicode_vars(std::env::vars_os())))
    }

    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<Response<Body>, serde_json::Error> {
        let json = serde_json::to_string_pretty(vars)?;
        let (content_type, body) = match self.format {
            OutputFormat::Json => ("application/json", json),
            OutputFormat::JavaScript => (
                "application/javascript",
                format!("window.{} = {};", self.var_name, json),
            ),
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        if self.no_cache {
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate"),
            );
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
        }
        Ok(response)
    }
}

/// Environment pairs with both key and value valid Unicode; others are skipped.
pub fn unicode_vars(
    env: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    env.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}
