//! Concept server (v1)
//!
//! A social-networking API served by a declarative route table.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                  CONCEPT SERVER                  │
//!                       │                                                  │
//!   Client Request      │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!   ────────────────────┼─▶│  http   │───▶│ dispatch │───▶│  routing   │   │
//!                       │  │ server  │    │          │    │   table    │   │
//!                       │  └─────────┘    └────┬─────┘    └────────────┘   │
//!                       │                      │                           │
//!                       │          ┌───────────┼───────────┐               │
//!                       │          ▼           ▼           ▼               │
//!                       │    ┌─────────┐ ┌──────────┐ ┌───────────┐        │
//!                       │    │ session │ │ binder + │ │  handler  │        │
//!                       │    │  store  │ │validator │ │ (concepts)│        │
//!                       │    └─────────┘ └──────────┘ └───────────┘        │
//!   Client Response     │                                                  │
//!   ◀───────────────────┼── JSON body + Set-Cookie                         │
//!                       │                                                  │
//!                       │  Cross-cutting: config, observability, lifecycle │
//!                       └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use concept_server::config::{self, ServerConfig};
use concept_server::lifecycle::{signals, Shutdown};
use concept_server::observability::{logging, metrics};
use concept_server::App;

#[derive(Parser)]
#[command(name = "concept-server")]
#[command(about = "Social-networking API server", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("concept-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        prefix = %config.api.prefix,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Route collisions are fatal here, before anything is bound.
    let app = App::new(&config)?;
    for route in app.table().routes() {
        tracing::debug!(method = %route.method, pattern = %route.pattern, "Route");
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::watch_signals(shutdown.clone()));

    app.into_server(config, shutdown).run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
