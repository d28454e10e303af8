//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration, apply command-line overrides, validate
//! - Start the metrics exporter when enabled
//! - Build the server and bind the listener (plain or TLS)
//! - Serve until shutdown, then drain within [`SHUTDOWN_GRACE`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{normalize_config, read_config, validate_config, ConfigError, ServeConfig};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::{Shutdown, SHUTDOWN_GRACE};
use crate::net::{load_tls_config, TlsError};
use crate::observability::{metrics, LogSink, TracingSink};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to prepare document root: {0}")]
    Root(#[source] io::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u32>,
    pub host: Option<String>,
    pub root_dir: Option<String>,
    pub directory_listing: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut ServeConfig) {
        if let Some(port) = self.port.filter(|p| *p > 0) {
            config.server.port = port;
        }
        if let Some(host) = self.host.as_ref().filter(|h| !h.is_empty()) {
            config.server.host = host.clone();
        }
        if let Some(root) = self.root_dir.as_ref().filter(|r| !r.is_empty()) {
            config.server.root_dir = root.clone();
        }
        if self.directory_listing {
            config.features.directory_listing = true;
        }
    }
}

/// Read the configuration (defaults without a file), apply overrides, then
/// normalize and validate.
pub fn prepare_config(path: Option<&Path>, overrides: &Overrides) -> Result<ServeConfig, StartupError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ServeConfig::default(),
    };
    overrides.apply(&mut config);
    normalize_config(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

async fn resolve_address(address: &str) -> Result<SocketAddr, StartupError> {
    let bind_error = |source| StartupError::Bind {
        address: address.to_string(),
        source,
    };
    tokio::net::lookup_host(address)
        .await
        .map_err(bind_error)?
        .next()
        .ok_or_else(|| bind_error(io::Error::new(io::ErrorKind::NotFound, "no address resolved")))
}

/// Run the server described by `config` until `shutdown` is triggered.
pub async fn serve(config: ServeConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.server.bind_address();
    let tls = if config.security.enable_https {
        Some(
            load_tls_config(
                Path::new(&config.security.cert_file),
                Path::new(&config.security.key_file),
            )
            .await?,
        )
    } else {
        None
    };

    let sink: Arc<dyn LogSink> = Arc::new(TracingSink::new(&config.logging));
    let server = HttpServer::new(config, sink).map_err(StartupError::Root)?;

    let served = async {
        match tls {
            Some(tls) => {
                let addr = resolve_address(&address).await?;
                server
                    .run_tls(addr, tls, shutdown.signal(), SHUTDOWN_GRACE)
                    .await
                    .map_err(StartupError::Serve)
            }
            None => {
                let listener = TcpListener::bind(&address)
                    .await
                    .map_err(|source| StartupError::Bind {
                        address: address.clone(),
                        source,
                    })?;
                server
                    .run(listener, shutdown.signal())
                    .await
                    .map_err(StartupError::Serve)
            }
        }
    };

    let deadline = async {
        shutdown.signal().await;
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    };

    tokio::select! {
        result = served => result,
        _ = deadline => {
            tracing::warn!(grace = ?SHUTDOWN_GRACE, "Graceful shutdown deadline exceeded, closing remaining connections");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"server": {"port": 9000, "root_dir": "/nope"}}"#).unwrap();

        let overrides = Overrides {
            port: Some(7000),
            host: Some("127.0.0.1".into()),
            root_dir: Some(dir.path().display().to_string()),
            directory_listing: true,
        };
        let config = prepare_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.features.directory_listing);
    }

    #[test]
    fn test_zero_port_override_is_ignored() {
        let mut config = ServeConfig::default();
        Overrides {
            port: Some(0),
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_invalid_config_fails() {
        let overrides = Overrides {
            root_dir: Some("/definitely/not/here".into()),
            ..Default::default()
        };
        assert!(matches!(
            prepare_config(None, &overrides),
            Err(StartupError::Config(ConfigError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServeConfig::default();
        config.server.root_dir = dir.path().display().to_string();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.logging.enabled = false;

        let shutdown = Shutdown::new();
        let task = tokio::spawn(serve(config, shutdown.clone()));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
