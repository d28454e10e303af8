//! URL path safety.
//!
//! Two independent checks run before the resolver touches the filesystem:
//! the normalizer canonicalizes the percent-decoded path and refuses any
//! leftover `..` segment, and the hidden-file check refuses dot-prefixed
//! segments. Neither guarantees containment under the document root; the
//! resolver enforces that separately.

use std::str::FromStr;

use axum::{
    body::Body,
    http::{uri::PathAndQuery, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::http::pipeline::{Interceptor, Next};
use crate::http::request::CanonicalPath;
use crate::observability::metrics;

/// Characters escaped when a canonical path is written back into a URI.
pub const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-decode a URL path. `None` for invalid UTF-8 or embedded NUL.
pub fn decode_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }
    Some(decoded.into_owned())
}

/// Lexically clean a path: unify separators, collapse repeats, resolve `.` and `..`.
///
/// Rooted paths cannot climb above `/`; relative paths keep leading `..`
/// segments, which [`has_parent_segment`] then reports.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let rooted = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if !rooted => segments.push(".."),
                _ => {}
            },
            name => segments.push(name),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Whether any segment is literally `..`.
pub fn has_parent_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}

/// Whether any segment other than `.`/`..` starts with a dot.
pub fn is_hidden_path(path: &str) -> bool {
    path.split(['/', '\\'])
        .any(|segment| segment.starts_with('.') && segment != "." && segment != "..")
}

/// The canonical path of a request: the normalizer's result when present,
/// otherwise decoded and cleaned on the spot.
pub fn canonical_path<B>(request: &Request<B>) -> Option<String> {
    if let Some(CanonicalPath(path)) = request.extensions().get::<CanonicalPath>() {
        return Some(path.clone());
    }
    decode_path(request.uri().path()).map(|decoded| normalize_path(&decoded))
}

fn rewrite_uri(uri: &Uri, canonical: &str) -> Option<Uri> {
    let encoded = utf8_percent_encode(canonical, PATH_ESCAPE).to_string();
    let path_and_query = match uri.query() {
        Some(query) => format!("{encoded}?{query}"),
        None => encoded,
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::from_str(&path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// Canonicalizes the request path; rejects undecodable paths (400) and
/// paths still containing `..` (403).
pub struct PathNormalizer;

impl Interceptor for PathNormalizer {
    fn name(&self) -> &'static str {
        "path_normalizer"
    }

    fn intercept<'a>(&'a self, mut request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(decoded) = decode_path(request.uri().path()) else {
                metrics::record_rejection("malformed_path");
                return (StatusCode::BAD_REQUEST, "400 Bad Request").into_response();
            };

            let canonical = normalize_path(&decoded);
            if has_parent_segment(&canonical) {
                tracing::debug!(path = %decoded, "Path traversal attempt rejected");
                metrics::record_rejection("path_traversal");
                return (StatusCode::FORBIDDEN, "403 Forbidden").into_response();
            }

            let Some(uri) = rewrite_uri(request.uri(), &canonical) else {
                metrics::record_rejection("malformed_path");
                return (StatusCode::BAD_REQUEST, "400 Bad Request").into_response();
            };
            *request.uri_mut() = uri;
            request.extensions_mut().insert(CanonicalPath(canonical));

            next.run(request).await
        })
    }
}

/// Rejects any path with a dot-prefixed segment with 403.
pub struct HiddenFileBlocker;

impl Interceptor for HiddenFileBlocker {
    fn name(&self) -> &'static str {
        "hidden_files"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match canonical_path(&request) {
                Some(path) if !is_hidden_path(&path) => next.run(request).await,
                Some(_) => {
                    metrics::record_rejection("hidden_file");
                    (StatusCode::FORBIDDEN, "403 Forbidden").into_response()
                }
                None => (StatusCode::BAD_REQUEST, "400 Bad Request").into_response(),
            }
        })
    }
}
