//! Edge request router.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                     EDGE ROUTER                      │
//!                  │                                                      │
//!  Client Request  │  ┌─────────┐   ┌──────────────────────────────────┐  │
//!  ────────────────┼─▶│  http   │──▶│         routing engine           │  │
//!                  │  │ server  │   │ environment → classifier →       │  │
//!                  │  └────┬────┘   │ redirect → language → rewrite    │  │
//!                  │       │        └──────────────────────────────────┘  │
//!                  │       ▼                                              │
//!  Client Response │  ┌─────────┐   ┌─────────┐                           │
//!  ◀───────────────┼──│annotate │◀──│  fetch  │◀──────────────────────────┼── Backends
//!                  │  └────┬────┘   └─────────┘                           │
//!                  │       └──▶ access log (detached) ────────────────────┼──▶ Log sink
//!                  │                                                      │
//!                  │  config (watch + reload) · observability · lifecycle │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_router::config::{load_config, watcher::ConfigWatcher, RouterConfig};
use edge_router::http::HttpServer;
use edge_router::lifecycle::{spawn_signal_handler, Shutdown};
use edge_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(about = "Edge request router", long_about = None)]
struct Args {
    /// Configuration file (TOML). Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = RouterConfig::default();
            edge_router::config::loader::apply_env_overrides(&mut config, |name| {
                std::env::var(name).ok()
            });
            config
        }
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-router starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rules = config.routing.rules.len(),
        redirects = config.redirects.len(),
        access_log = config.access_log.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => (tokio::sync::mpsc::unbounded_channel().1, None),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
