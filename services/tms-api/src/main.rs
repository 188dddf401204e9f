//! Coverage Tile Server
//!
//! Serves radio coverage map tiles rendered from aggregated grid cells.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use tms_api::build_router;
use tms_api::config::ServiceConfig;
use tms_api::maintenance::LivenessJanitor;
use tms_api::metrics::install_prometheus;
use tms_api::state::AppState;

/// Coverage Tile Server
#[derive(Parser, Debug)]
#[command(name = "tms-api")]
#[command(about = "Radio coverage map tile server")]
struct Args {
    /// Listen address. A bare ":port" listens on all interfaces.
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDRESS")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "TMS_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// YAML file with the network alias table
    #[arg(long, env = "TMS_CONFIG_FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting coverage tile server");

    let prometheus = install_prometheus()?;
    info!("Prometheus metrics exporter initialized");

    let mut config = ServiceConfig::from_env()?;
    if let Some(path) = &args.config {
        config = config.with_file(path)?;
    }
    config.log_summary();

    let state = match AppState::connect(config, Some(prometheus)).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            return Err(e);
        }
    };

    tokio::spawn(LivenessJanitor::new(state.liveness.clone()).run_forever());

    let app = build_router(state);

    let addr = parse_listen_address(&args.listen)?;
    info!("Tile server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Tile server stopped");
    Ok(())
}

fn parse_listen_address(listen: &str) -> Result<SocketAddr> {
    let listen = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    };
    listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", listen))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_port_listens_on_all_interfaces() {
        assert_eq!(
            parse_listen_address(":8080").unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_address("nonsense").is_err());
    }
}
