//! Redundafier gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                     GATEWAY                          │
//!   Client request  │  ┌─────────┐   ┌───────────┐   ┌──────────────┐      │
//!   ────────────────┼─▶│  http   │──▶│  routing  │──▶│ health gate  │      │
//!                   │  │ server  │   │ + rewrite │   └──────┬───────┘      │
//!                   │  └─────────┘   └───────────┘          │              │
//!                   │                                       ▼              │
//!                   │                               ┌──────────────┐       │   ┌──────────┐
//!                   │                               │  dispatcher  │═══════┼══▶│ upstream │
//!                   │                               │   (N calls)  │◀══════┼═══│          │
//!                   │                               └──────┬───────┘       │   └──────────┘
//!   Client response │  ┌────────────┐                      │               │
//!   ◀───────────────┼──│ reconciler │◀─────────────────────┘               │
//!                   │  └────────────┘                                      │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use redundafier::config::{load_config, GatewayConfig};
use redundafier::lifecycle::signals::wait_for_signal;
use redundafier::observability::{logging, metrics};
use redundafier::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "redundafier")]
#[command(about = "HTTP gateway that dispatches every API request redundantly", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`
    #[arg(short, long)]
    bind: Option<String>,

    /// Expose internal error details in responses
    #[arg(long)]
    development: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    config.server.development |= cli.development;

    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "redundafier starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        fan_out = config.dispatch.fan_out,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        development = config.server.development,
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

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
