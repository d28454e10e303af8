//! `Cache-Control` injection.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    response::Response,
};
use futures_util::future::BoxFuture;

use crate::http::pipeline::{Interceptor, Next};

/// Adds `Cache-Control: public, max-age=N` to responses that do not carry one.
///
/// Error responses are left alone so rejections and missing files are never
/// cached publicly.
pub struct CacheControl {
    value: HeaderValue,
}

impl CacheControl {
    /// `None` when `max_age` is zero, which disables the header.
    pub fn new(max_age: u64) -> Option<Self> {
        if max_age == 0 {
            return None;
        }
        let value = HeaderValue::from_str(&format!("public, max-age={max_age}")).ok()?;
        Some(Self { value })
    }
}

impl Interceptor for CacheControl {
    fn name(&self) -> &'static str {
        "cache_control"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(request).await;
            if !response.status().is_client_error() && !response.status().is_server_error() {
                response
                    .headers_mut()
                    .entry(header::CACHE_CONTROL)
                    .or_insert_with(|| self.value.clone());
            }
            response
        })
    }
}
