use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labsync_core::{
    load_config, load_config_from_env, validate_config, ConfirmationStore, ConfirmationSync,
    HttpLabInterface, LabInterface, SanitizedConfig, SqliteConfirmationStore,
};
use labsync_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting labsync {}", VERSION);

    // Load configuration: optional TOML file, LABSYNC_* overrides on top
    let config = match std::env::var("LABSYNC_CONFIG").map(PathBuf::from) {
        Ok(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            load_config(&config_path)
                .with_context(|| format!("Failed to load config from {:?}", config_path))?
        }
        Err(_) => {
            info!("LABSYNC_CONFIG not set, loading configuration from environment");
            load_config_from_env().context("Failed to load config from environment")?
        }
    };

    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    let config_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));

    info!("Configuration loaded successfully (hash {})", &config_hash[..16]);
    info!("Upstream: {}", config.upstream.url);
    info!("Database path: {:?}", config.database.path);
    info!(
        concurrency = config.sync.concurrency,
        max_attempts = config.sync.max_attempts,
        max_batches = config.sync.max_batches,
        "Sync settings"
    );

    // Create SQLite confirmation store
    let store: Arc<dyn ConfirmationStore> = Arc::new(
        SqliteConfirmationStore::new(&config.database.path)
            .context("Failed to create confirmation store")?,
    );
    info!("Confirmation store initialized");

    // Create lab interface client
    let lab: Arc<dyn LabInterface> = Arc::new(
        HttpLabInterface::new(config.upstream.clone())
            .context("Failed to create lab interface client")?,
    );

    let sync = Arc::new(ConfirmationSync::new(
        lab,
        Arc::clone(&store),
        config.sync.clone(),
    ));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store, sync));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
}
