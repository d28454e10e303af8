//! HTTP Basic authentication.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures_util::future::BoxFuture;
use subtle::ConstantTimeEq;

use crate::config::BasicAuthConfig;
use crate::http::pipeline::{Interceptor, Next};
use crate::observability::metrics;

/// Username and password decoded from an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Parse a `Basic` credential header value. `None` for any other scheme or malformed payload.
pub fn parse_basic(value: &str) -> Option<Credentials> {
    let (scheme, payload) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Compare both fields in constant time; the password is always evaluated.
pub fn credentials_match(given: &Credentials, username: &str, password: &str) -> bool {
    let user_ok = given.username.as_bytes().ct_eq(username.as_bytes());
    let pass_ok = given.password.as_bytes().ct_eq(password.as_bytes());
    bool::from(user_ok & pass_ok)
}

/// Requires valid Basic credentials; answers 401 with a challenge otherwise.
pub struct BasicAuthInterceptor {
    enabled: bool,
    username: String,
    password: String,
    challenge: HeaderValue,
}

impl BasicAuthInterceptor {
    pub fn new(config: &BasicAuthConfig) -> Self {
        let realm = config.realm.replace(['"', '\\'], "");
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{realm}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic realm=\"Restricted\""));
        Self {
            enabled: config.enabled,
            username: config.username.clone(),
            password: config.password.clone(),
            challenge,
        }
    }

    fn unauthorized(&self) -> Response {
        metrics::record_rejection("unauthorized");
        let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, self.challenge.clone());
        response
    }
}

impl Interceptor for BasicAuthInterceptor {
    fn name(&self) -> &'static str {
        "basic_auth"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if !self.enabled {
                return next.run(request).await;
            }

            let credentials = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_basic);

            match credentials {
                Some(given) if credentials_match(&given, &self.username, &self.password) => {
                    next.run(request).await
                }
                Some(given) => {
                    tracing::debug!(username = %given.username, "Rejected basic auth credentials");
                    self.unauthorized()
                }
                None => self.unauthorized(),
            }
        })
    }
}
