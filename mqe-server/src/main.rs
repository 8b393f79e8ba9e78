//! mqe-server - Meeting Quality Evaluation backend
//!
//! Resolves configuration, opens the SQLite database in the root folder and
//! serves the HTTP/SSE API until Ctrl-C or SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mqe_common::config::{
    self, CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use mqe_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mqe_server::AppState;

/// Command-line arguments for mqe-server
#[derive(Parser, Debug)]
#[command(name = "mqe-server")]
#[command(about = "Meeting quality evaluation service")]
#[command(version)]
struct Args {
    /// Port to listen on (default 5780)
    #[arg(short, long, env = "MQE_PORT")]
    port: Option<u16>,

    /// Address to bind (default 127.0.0.1)
    #[arg(short, long, env = "MQE_BIND")]
    bind: Option<String>,

    /// Root folder holding the database (overrides MQE_ROOT_FOLDER and config)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: ~/.config/mqe/config.toml)
    #[arg(short, long, env = "MQE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let defaults = CompiledDefaults::for_current_platform();

    // Pre-read the log level so the filter exists before config loading logs
    let log_level = args
        .config
        .clone()
        .or_else(config::default_config_path)
        .and_then(|path| TomlConfig::load(&path).ok())
        .map(|toml| toml.logging.level)
        .unwrap_or_else(|| defaults.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mqe-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load_or_default(args.config.as_deref());

    let bind_address = args
        .bind
        .clone()
        .or_else(|| toml_config.bind_address.clone())
        .unwrap_or(defaults.bind_address);
    let port = args.port.or(toml_config.port).unwrap_or(defaults.port);
    let event_bus_capacity = toml_config
        .event_bus_capacity
        .unwrap_or(defaults.event_bus_capacity);

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), toml_config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = mqe_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let event_bus = EventBus::new(event_bus_capacity);
    info!("Event bus initialized (capacity {})", event_bus_capacity);

    let app = mqe_server::build_router(AppState::new(db_pool.clone(), event_bus));

    let addr = format!("{}:{}", bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db_pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
