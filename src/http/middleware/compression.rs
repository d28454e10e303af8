//! Streaming gzip response compression.

use std::io;

use async_compression::{tokio::bufread::GzipEncoder, Level};
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::Response,
};
use futures_util::{future::BoxFuture, TryStreamExt};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::http::pipeline::{Interceptor, Next};

/// Whether `Accept-Encoding` lists gzip with a non-zero quality.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|entry| {
            let mut parts = entry.split(';').map(str::trim);
            let coding = parts.next().unwrap_or_default();
            let rejected = parts.any(|p| {
                p.strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            (coding.eq_ignore_ascii_case("gzip") || coding == "*") && !rejected
        })
}

fn should_compress(response: &Response) -> bool {
    response.status() != StatusCode::NO_CONTENT
        && response.status() != StatusCode::PARTIAL_CONTENT
        && response.status() != StatusCode::NOT_MODIFIED
        && !response.headers().contains_key(header::CONTENT_ENCODING)
}

/// Gzip-encodes the body of every eligible response at the configured level.
///
/// HEAD responses get the same header rewrite as the matching GET and an
/// empty body.
pub struct Compression {
    level: u32,
}

impl Compression {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(1, 9),
        }
    }
}

impl Interceptor for Compression {
    fn name(&self) -> &'static str {
        "compression"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let wants_gzip = accepts_gzip(request.headers());
            let method = request.method().clone();

            let response = next.run(request).await;
            if !wants_gzip || !should_compress(&response) {
                return response;
            }

            let (mut parts, body) = response.into_parts();
            parts.headers.remove(header::CONTENT_LENGTH);
            parts
                .headers
                .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            parts
                .headers
                .append(header::VARY, HeaderValue::from_static("accept-encoding"));

            if method == Method::HEAD {
                return Response::from_parts(parts, Body::empty());
            }

            let reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
            let encoder = GzipEncoder::with_quality(reader, Level::Precise(self.level as i32));
            Response::from_parts(parts, Body::from_stream(ReaderStream::new(encoder)))
        })
    }
}
