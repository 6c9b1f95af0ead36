//! Server initialization
//!
//! Wires storage, generation and the canvas orchestrator together, then
//! serves the HTTP and WebSocket surface until a shutdown signal arrives.

use super::config::AppConfig;
use anyhow::{Context, Result};
use axum::{extract::Extension, routing::get, Router};
use easel_canvas::CanvasOrchestrator;
use easel_gen::GenerationClient;
use easel_store::SqliteImageStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

/// Build the orchestrator over SQLite storage and the OpenAI-compatible backend
pub async fn build_orchestrator(config: &AppConfig) -> Result<Arc<CanvasOrchestrator>> {
    let store = Arc::new(
        SqliteImageStore::connect(&config.storage)
            .await
            .context("Failed to open image store")?,
    );

    let mut generation = config.generation.clone();
    generation
        .load_api_key()
        .context("Image generation is not configured")?;
    let generator = GenerationClient::from_config(&generation)
        .context("Failed to create generation client")?
        .with_lineage(store.clone());

    Ok(Arc::new(CanvasOrchestrator::new(
        config.canvas.clone(),
        Arc::new(generator),
        store,
    )))
}

/// Build the router for a running orchestrator
pub fn build_router(canvas: Arc<CanvasOrchestrator>, media_dir: &Path, media_url: &str) -> Router {
    let app = Router::new()
        .merge(crate::api::health_routes())
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .route("/", get(|| async { "Easel canvas server" }));

    // Media is only served locally when it lives under a path prefix
    let app = if media_url.starts_with('/') && media_url.len() > 1 {
        app.nest_service(media_url.trim_end_matches('/'), ServeDir::new(media_dir))
    } else {
        app
    };

    app.layer(Extension(canvas))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run(config: AppConfig) -> Result<()> {
    info!("Starting Easel v{}", env!("CARGO_PKG_VERSION"));

    let canvas = build_orchestrator(&config).await?;
    let watcher = canvas.spawn_prompt_watcher();

    let saved = canvas.load_saved_catalog().await;
    info!(saved, "saved catalog loaded");
    canvas.mount().await;

    let app = build_router(
        Arc::clone(&canvas),
        &config.storage.media_dir,
        &config.storage.public_base_url,
    );

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .context("Invalid server address")?;

    info!("HTTP server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    watcher.abort();
    info!("Easel shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
