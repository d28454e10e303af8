//! Metrics collection and exposition.
//!
//! # Metrics
//! - `static_requests_total` (counter): requests by method, status
//! - `static_request_duration_seconds` (histogram): time to response head
//! - `static_rejections_total` (counter): requests refused by an interceptor, by reason
//! - `static_rate_limit_visitors` (gauge): tracked rate-limit buckets
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "static_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("static_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("static_rejections_total", "reason" => reason).increment(1);
}

pub fn record_visitors(count: usize) {
    gauge!("static_rate_limit_visitors").set(count as f64);
}
