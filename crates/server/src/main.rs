//! Tally server binary.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use tally_core::config::AppConfig;
use tally_server::{AppState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tally - a persistent counter service
#[derive(Parser, Debug)]
#[command(name = "tallyd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (optional; TALLY_* env vars also apply)
    #[arg(
        short,
        long,
        env = "TALLY_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Default log filter when RUST_LOG is unset.
fn default_log_filter(debug: bool) -> &'static str {
    if debug {
        "debug,tower_http=debug"
    } else {
        "info,tower_http=info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration comes first so the debug flag can pick the log level
    let config = AppConfig::load(&args.config).context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(config.app.debug).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("{} v{}", config.app.name, config.app.version);
    if Path::new(&args.config).exists() {
        tracing::info!(config_path = %args.config, "Loaded configuration from file");
    } else {
        tracing::debug!(
            "No config file found at {}, using defaults and environment",
            args.config
        );
    }

    tally_server::metrics::register_metrics();

    // Opening the store runs the schema migration; failure aborts startup
    let metadata = tally_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    metadata
        .health_check()
        .await
        .context("metadata store health check failed")?;
    tracing::info!("Metadata store initialized");

    let addr: SocketAddr = config
        .server
        .bind_addr()
        .parse()
        .context("invalid bind address")?;

    let state = AppState::new(config, metadata);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}
