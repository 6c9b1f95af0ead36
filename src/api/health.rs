//! Health check endpoint
//!
//! `/health` reports liveness plus a few canvas counters for diagnostics.

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use easel_canvas::CanvasOrchestrator;
use serde::Serialize;
use std::sync::Arc;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub entities: usize,
    pub saved: usize,
    pub subscribers: usize,
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health))
}

async fn health(Extension(canvas): Extension<Arc<CanvasOrchestrator>>) -> Json<HealthResponse> {
    let snapshot = canvas.snapshot().await;
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        entities: snapshot.entities.len(),
        saved: snapshot.saved_catalog.len(),
        subscribers: canvas.events().subscriber_count(),
    })
}
