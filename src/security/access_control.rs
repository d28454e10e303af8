//! Client address filtering.
//!
//! Client keys are the bare host of the peer address: port removed and IPv6
//! brackets stripped. The filter checks the deny list first, then the allow
//! list when one is configured.

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

use crate::http::pipeline::{Interceptor, Next};
use crate::http::request::remote_addr;
use crate::observability::metrics;

/// Normalize a peer address (`host`, `host:port`, `[v6]`, `[v6]:port`) to its host.
pub fn client_key(remote_addr: &str) -> String {
    let remote_addr = remote_addr.trim();

    if let Ok(addr) = remote_addr.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }

    if let Some(rest) = remote_addr.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return rest[..end].to_string();
        }
    }

    // `host:port` with a non-IP host; bare IPv6 has more than one colon.
    match remote_addr.split_once(':') {
        Some((host, port)) if !port.contains(':') => host.to_string(),
        _ => remote_addr.trim_matches(|c| c == '[' || c == ']').to_string(),
    }
}

/// Outcome of matching a client key against the configured lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Allow,
    Denied,
    NotAllowListed,
}

/// Allow/deny lists of client keys.
#[derive(Debug, Clone, Default)]
pub struct IpFilter {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl IpFilter {
    pub fn new(allow: &[String], deny: &[String]) -> Self {
        Self {
            allow: allow.iter().map(|e| client_key(e)).collect(),
            deny: deny.iter().map(|e| client_key(e)).collect(),
        }
    }

    /// Whether either list is non-empty.
    pub fn is_active(&self) -> bool {
        !self.allow.is_empty() || !self.deny.is_empty()
    }

    pub fn check(&self, key: &str) -> FilterDecision {
        if key.is_empty() || self.deny.iter().any(|d| d == key) {
            return FilterDecision::Denied;
        }
        if !self.allow.is_empty() && !self.allow.iter().any(|a| a == key) {
            return FilterDecision::NotAllowListed;
        }
        FilterDecision::Allow
    }
}

/// Rejects clients on the deny list, or missing from a non-empty allow list, with 403.
pub struct IpFilterInterceptor {
    filter: IpFilter,
}

impl IpFilterInterceptor {
    pub fn new(filter: IpFilter) -> Self {
        Self { filter }
    }
}

impl Interceptor for IpFilterInterceptor {
    fn name(&self) -> &'static str {
        "ip_filter"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let key = remote_addr(&request)
                .map(|addr| client_key(&addr))
                .unwrap_or_default();

            match self.filter.check(&key) {
                FilterDecision::Allow => next.run(request).await,
                decision => {
                    tracing::debug!(client = %key, ?decision, "Client rejected by IP filter");
                    metrics::record_rejection("ip_filter");
                    (StatusCode::FORBIDDEN, "403 Forbidden").into_response()
                }
            }
        })
    }
}
