//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from [`LoggingConfig`]
//! - Define the [`LogSink`] the request path reports to
//! - Provide the tracing-backed sink used in production
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level
//! - The sink decides *whether* to emit; formatting belongs to the subscriber

use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// One completed request, as reported by the access-log interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
    pub remote_addr: String,
    pub request_id: Option<String>,
}

/// Destination for request-path diagnostics.
pub trait LogSink: Send + Sync + 'static {
    fn access(&self, record: &AccessRecord);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// [`LogSink`] writing through `tracing`.
#[derive(Debug, Clone)]
pub struct TracingSink {
    enabled: bool,
    access_log: bool,
    error_log: bool,
}

impl TracingSink {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            access_log: config.access_log,
            error_log: config.error_log,
        }
    }
}

impl LogSink for TracingSink {
    fn access(&self, record: &AccessRecord) {
        if !self.enabled || !self.access_log {
            return;
        }
        tracing::info!(
            target: "access",
            method = %record.method,
            path = %record.path,
            status = record.status,
            duration = ?record.duration,
            remote_addr = %record.remote_addr,
            request_id = record.request_id.as_deref().unwrap_or("-"),
            "request completed"
        );
    }

    fn error(&self, message: &str) {
        if self.enabled && self.error_log {
            tracing::error!("{message}");
        }
    }

    fn warn(&self, message: &str) {
        if self.enabled {
            tracing::warn!("{message}");
        }
    }

    fn info(&self, message: &str) {
        if self.enabled {
            tracing::info!("{message}");
        }
    }

    fn debug(&self, message: &str) {
        if self.enabled {
            tracing::debug!("{message}");
        }
    }
}

/// Install the global subscriber.
///
/// Logs go to stdout, and additionally to `log_file` (without ANSI colors)
/// when one is configured.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("static_server={level},access={level},tower_http=warn", level = config.level).into()
        })
    };

    let stdout = tracing_subscriber::fmt::layer()
        .with_ansi(config.color_output)
        .with_filter(filter());

    let file = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(stdout).with(file).init();
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Sink capturing everything it receives.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub access: Mutex<Vec<AccessRecord>>,
        pub errors: Mutex<Vec<String>>,
    }

    impl LogSink for RecordingSink {
        fn access(&self, record: &AccessRecord) {
            self.access.lock().unwrap().push(record.clone());
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn warn(&self, _message: &str) {}
        fn info(&self, _message: &str) {}
        fn debug(&self, _message: &str) {}
    }

    #[test]
    fn test_sink_respects_flags() {
        let config = LoggingConfig {
            enabled: false,
            ..Default::default()
        };
        let sink = TracingSink::new(&config);
        assert!(!sink.enabled);

        let sink = TracingSink::new(&LoggingConfig::default());
        assert!(sink.enabled && sink.access_log && sink.error_log);
    }
}
