//! Surveyor Binary Entry Point
//!
//! This binary runs the collection loop against a central server. Core
//! functionality is provided by the `surveyor` library crate.

use std::sync::Arc;

use clap::Parser;
use surveyor::{adapters, config, CollectorRegistry, EngineConfig, Scheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Surveyor - Quality Metric Collection Engine
#[derive(Parser, Debug)]
#[command(name = "surveyor", version, about, long_about = None)]
struct Cli {
    /// Base URL of the central server
    #[arg(
        long,
        default_value = "http://localhost:5001/api",
        env = "SURVEYOR_SERVER_URL"
    )]
    server_url: String,

    /// Interval between collection cycles (e.g., "60s", "5m")
    #[arg(long, default_value = "60s", env = "SURVEYOR_POLL_INTERVAL")]
    poll_interval: String,

    /// Timeout for each outgoing request
    #[arg(long, default_value = "10s", env = "SURVEYOR_REQUEST_TIMEOUT")]
    request_timeout: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,surveyor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let engine_config = EngineConfig::new(&cli.server_url)?
        .with_poll_interval(config::parse_duration(&cli.poll_interval)?)
        .with_request_timeout(config::parse_duration(&cli.request_timeout)?);

    let registry = Arc::new(CollectorRegistry::with_default_adapters());
    tracing::info!(adapters = registry.len(), "Surveyor - Quality Metric Collection Engine");

    let definitions = Arc::new(adapters::default_definitions());
    let scheduler = Scheduler::new(engine_config, registry, definitions)?;

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping collection loop");
        }
    }

    Ok(())
}
