//! Request identification helpers.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client sends none
//! - Expose the peer address recorded by the transport
//! - Carry the canonical request path between interceptors

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(value))
    }
}

/// Canonical, percent-decoded request path, set by the path normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPath(pub String);

/// The peer address as `host:port`, if the transport recorded one.
pub fn remote_addr(request: &Request<Body>) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
}

/// The request ID header value, if any.
pub fn request_id(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
