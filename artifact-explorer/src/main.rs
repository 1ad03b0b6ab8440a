//! artifact-explorer - artifact classification explorer service
//!
//! Opens (or creates) the target store under the root folder, optionally opens
//! a separate read-only source store, and serves the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use artifact_common::config::{CliOverrides, ExplorerConfig, TomlConfig};
use artifact_common::db::{connect_source, init_database};
use artifact_explorer::{build_router, AppState, ServiceSettings};
use clap::Parser;
use tokio::signal;
use tracing::info;

/// Command-line arguments for artifact-explorer
#[derive(Parser, Debug)]
#[command(name = "artifact-explorer")]
#[command(about = "Browse, import and query museum artifacts by classification")]
#[command(version)]
struct Args {
    /// Root folder holding the target database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Separate origin database (read-only); defaults to the target database
    #[arg(short, long)]
    source_db: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file (TOML)
    #[arg(short, long, env = "ARTIFACT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting artifact-explorer v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let toml_config = TomlConfig::load_or_default(args.config.as_deref());
    let cli = CliOverrides {
        root_folder: args.root_folder,
        source_database: args.source_db,
        port: args.port,
    };
    let config = ExplorerConfig::resolve(&cli, &toml_config).context("Invalid configuration")?;
    info!("Root folder: {}", config.root_folder.display());

    let db_path = config.database_path();
    let target = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let source = match &config.source_database {
        Some(path) => connect_source(path)
            .await
            .with_context(|| format!("Failed to open source database {}", path.display()))?,
        None => {
            info!("No source database configured, reading from the target database");
            target.clone()
        }
    };

    let state = AppState::new(source, target, ServiceSettings::from(&config));
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("artifact-explorer listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
