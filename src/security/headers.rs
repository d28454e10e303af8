//! Response header injection.
//!
//! # Responsibilities
//! - Add the fixed security headers (nosniff, frame deny, legacy XSS filter)
//! - Add operator-configured custom headers
//!
//! # Design Decisions
//! - Headers are inserted only when absent; whatever the inner chain or the
//!   resolver set takes precedence
//! - Header names and values are parsed once, at construction

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Request},
    response::Response,
};
use futures_util::future::BoxFuture;

use crate::http::pipeline::{Interceptor, Next};

/// Adds a fixed set of headers to every response that lacks them.
pub struct HeaderInjector {
    name: &'static str,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderInjector {
    pub fn new(name: &'static str, headers: Vec<(HeaderName, HeaderValue)>) -> Self {
        Self { name, headers }
    }

    /// The browser hardening headers applied to every response.
    pub fn security() -> Self {
        Self::new(
            "security_headers",
            vec![
                (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
                (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
                (header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")),
            ],
        )
    }

    /// Operator-configured headers. Entries that are not valid HTTP are skipped
    /// with a warning; validation normally rejects them earlier.
    pub fn custom(headers: &BTreeMap<String, String>) -> Self {
        let parsed = headers
            .iter()
            .filter_map(|(name, value)| {
                match (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    (Ok(name), Ok(value)) => Some((name, value)),
                    _ => {
                        tracing::warn!(header = %name, "Skipping invalid custom header");
                        None
                    }
                }
            })
            .collect();
        Self::new("custom_headers", parsed)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl Interceptor for HeaderInjector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            for (name, value) in &self.headers {
                headers.entry(name).or_insert_with(|| value.clone());
            }
            response
        })
    }
}
