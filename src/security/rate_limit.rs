//! Per-client rate limiting with token buckets.
//!
//! Each client key owns a bucket of whole tokens. Buckets are created on
//! first sight, refilled by `requests_per_ip` tokens per elapsed minute and
//! capped at the configured capacity. A background sweeper drops buckets
//! that have been idle for three sweep intervals.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::http::pipeline::{Interceptor, Next};
use crate::http::request::remote_addr;
use crate::observability::metrics;
use crate::security::access_control::client_key;

/// How often idle buckets are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Buckets idle for this long are dropped by the sweeper.
pub const IDLE_TTL_FACTOR: u32 = 3;

#[derive(Debug, Clone, Copy)]
struct VisitorState {
    last_seen: Instant,
    tokens: u64,
}

struct LimiterState {
    visitors: Mutex<HashMap<String, VisitorState>>,
    enabled: bool,
    capacity: u64,
    refill_per_minute: u64,
}

impl LimiterState {
    fn visitors(&self) -> MutexGuard<'_, HashMap<String, VisitorState>> {
        // Every critical section leaves the map consistent, so a poisoned lock is still usable.
        self.visitors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict_idle(&self, now: Instant, ttl: Duration) -> usize {
        let mut visitors = self.visitors();
        let before = visitors.len();
        visitors.retain(|_, v| now.saturating_duration_since(v.last_seen) <= ttl);
        let evicted = before - visitors.len();
        metrics::record_visitors(visitors.len());
        evicted
    }
}

/// Token-bucket limiter keyed by client address.
///
/// Dropping the limiter stops its sweeper task.
pub struct RateLimiter {
    state: Arc<LimiterState>,
    sweep_interval: Duration,
    sweeper: Option<JoinHandle<()>>,
}

impl RateLimiter {
    /// Create a limiter sweeping every [`SWEEP_INTERVAL`].
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_sweep_interval(config, SWEEP_INTERVAL)
    }

    /// Create a limiter with a custom sweep interval.
    ///
    /// The sweeper is only started when called inside a Tokio runtime and the
    /// limiter is enabled.
    pub fn with_sweep_interval(config: &RateLimitConfig, sweep_interval: Duration) -> Self {
        let state = Arc::new(LimiterState {
            visitors: Mutex::new(HashMap::new()),
            enabled: config.enabled,
            capacity: config.capacity(),
            refill_per_minute: config.refill_per_minute(),
        });

        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(handle) if config.enabled => Some(handle.spawn(sweep_loop(
                Arc::downgrade(&state),
                sweep_interval,
            ))),
            _ => None,
        };

        Self {
            state,
            sweep_interval,
            sweeper,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Bucket capacity after coercion.
    pub fn capacity(&self) -> u64 {
        self.state.capacity
    }

    /// Consume a token for `key`, returning whether the request may proceed.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// [`allow`](Self::allow) with an explicit clock reading.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        if !self.state.enabled {
            return true;
        }

        let capacity = self.state.capacity;
        let mut visitors = self.state.visitors();

        let Some(visitor) = visitors.get_mut(key) else {
            visitors.insert(
                key.to_string(),
                VisitorState {
                    last_seen: now,
                    tokens: capacity - 1,
                },
            );
            return true;
        };

        let elapsed_minutes = now.saturating_duration_since(visitor.last_seen).as_secs_f64() / 60.0;
        let refill = (elapsed_minutes * self.state.refill_per_minute as f64).floor() as u64;
        visitor.tokens = visitor.tokens.saturating_add(refill).min(capacity);
        visitor.last_seen = now;

        if visitor.tokens > 0 {
            visitor.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Drop buckets idle for longer than three sweep intervals, returning how many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        self.state.evict_idle(now, self.sweep_interval * IDLE_TTL_FACTOR)
    }

    /// Number of tracked client keys.
    pub fn visitor_count(&self) -> usize {
        self.state.visitors().len()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

async fn sweep_loop(state: Weak<LimiterState>, interval: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        ticker.tick().await;
        let Some(state) = state.upgrade() else {
            break;
        };
        let evicted = state.evict_idle(Instant::now(), interval * IDLE_TTL_FACTOR);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle rate limit buckets");
        }
    }
}

/// Rejects clients whose bucket is empty with 429.
pub struct RateLimitInterceptor {
    limiter: RateLimiter,
}

impl RateLimitInterceptor {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl Interceptor for RateLimitInterceptor {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn intercept<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if !self.limiter.is_enabled() {
                return next.run(request).await;
            }

            let Some(key) = remote_addr(&request).map(|addr| client_key(&addr)) else {
                metrics::record_rejection("unknown_client");
                return (StatusCode::FORBIDDEN, "403 Forbidden").into_response();
            };

            if self.limiter.allow(&key) {
                next.run(request).await
            } else {
                tracing::warn!(client = %key, "Rate limit exceeded");
                metrics::record_rejection("rate_limit");
                (StatusCode::TOO_MANY_REQUESTS, "429 Too Many Requests").into_response()
            }
        })
    }
}
