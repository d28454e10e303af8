//! Static content server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net (TCP | TLS) ──▶ http::server (timeout, request id, trace)
//!                                              │
//!                                              ▼
//!                                   http::pipeline
//!                    access log → headers → ip filter → rate limit → auth
//!                    → cors → path normalizer → hidden files → compression
//!                    → cache control
//!                                              │
//!                                              ▼
//!     Client Response          runtime config endpoint | resolver (files,
//!     ◀────────────────────────  index, SPA fallback, listings, error pages)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use static_server::config::{example_config, save_config};
use static_server::lifecycle::{self, signals, Overrides, Shutdown};
use static_server::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "static-server", version, about = "Static content server")]
struct Cli {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u32>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Root directory to serve (overrides config)
    #[arg(short, long)]
    dir: Option<String>,

    /// Enable directory listing
    #[arg(short, long)]
    list: bool,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    generate_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(path) = &cli.generate_config {
        return match save_config(path, &example_config()) {
            Ok(()) => {
                println!("Example configuration saved to: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error generating config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let overrides = Overrides {
        port: cli.port,
        host: cli.host,
        root_dir: cli.dir,
        directory_listing: cli.list,
    };
    let config = match lifecycle::prepare_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Error creating logger: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.server.bind_address(),
        root = %config.server.root_dir,
        https = config.security.enable_https,
        "static-server starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    match lifecycle::serve(config, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
