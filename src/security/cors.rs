//! Cross-origin resource sharing.
//!
//! Headers are attached only for allowed origins. Every `OPTIONS` request
//! is answered with 204 once CORS is enabled, whatever the origin; the
//! browser still enforces the policy through the missing headers.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;

use crate::config::CorsConfig;
use crate::http::pipeline::{Interceptor, Next};

/// Origin policy derived from [`CorsConfig`].
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<String>,
    methods: Option<HeaderValue>,
    headers: Option<HeaderValue>,
    credentials: bool,
    max_age: Option<HeaderValue>,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        let joined = |items: &[String]| {
            if items.is_empty() {
                None
            } else {
                HeaderValue::from_str(&items.join(", ")).ok()
            }
        };
        Self {
            origins: config.allowed_origins.clone(),
            methods: joined(&config.allowed_methods),
            headers: joined(&config.allowed_headers),
            credentials: config.allow_credentials,
            max_age: (config.max_age > 0).then(|| HeaderValue::from(config.max_age)),
        }
    }

    /// Whether the configuration is exactly `["*"]`.
    pub fn is_wildcard_only(&self) -> bool {
        matches!(self.origins.as_slice(), [only] if only == "*")
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == "*" || o == origin)
    }

    /// Add the CORS response headers for `origin`, if it is allowed.
    pub fn apply(&self, origin: &str, headers: &mut HeaderMap) {
        if !self.is_allowed(origin) {
            return;
        }

        let allow_origin = if self.is_wildcard_only() {
            HeaderValue::from_static("*")
        } else {
            match HeaderValue::from_str(origin) {
                Ok(value) => value,
                Err(_) => return,
            }
        };
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);

        if let Some(methods) = &self.methods {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
        }
        if let Some(allowed) = &self.headers {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allowed.clone());
        }
        if self.credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Some(max_age) = &self.max_age {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, max_age.clone());
        }
    }
}

pub struct CorsInterceptor {
    enabled: bool,
    policy: CorsPolicy,
}

impl CorsInterceptor {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            enabled: config.enabled,
            policy: CorsPolicy::new(config),
        }
    }
}

impl Interceptor for CorsInterceptor {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if !self.enabled {
                return next.run(request).await;
            }

            let origin = request
                .headers()
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            let mut response = if request.method() == Method::OPTIONS {
                StatusCode::NO_CONTENT.into_response()
            } else {
                next.run(request).await
            };

            self.policy.apply(&origin, response.headers_mut());
            response
        })
    }
}
