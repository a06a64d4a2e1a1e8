//! swipe-movie-api server entry point.
//!
//! Loads configuration, picks the store, and serves the REST API.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use swipe_movie_api::api;
use swipe_movie_api::app_state::AppState;
use swipe_movie_api::clients::Clients;
use swipe_movie_api::config::{AppConfig, LogFormat};
use swipe_movie_api::persistence::{MemoryStore, PostgresStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        environment = %config.environment,
        "starting swipe-movie-api"
    );

    // Storage
    let store: Arc<dyn Store> = if config.persistence_enabled {
        Arc::new(PostgresStore::connect(&config).await?)
    } else {
        tracing::warn!("persistence disabled; using the in-memory store");
        Arc::new(MemoryStore::new())
    };

    // Outbound integrations
    let clients = Clients::from_config(&config)?;
    if clients.catalog.is_none() {
        tracing::warn!("TMDB_API_KEY not set; movie endpoints answer 503");
    }

    // Build application state and router
    let listen_addr = config.listen_addr;
    let app_state = AppState::new(config, store, clients);
    let app = api::build_router(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
