//! Web API module for Easel
//!
//! Provides REST API endpoints for:
//! - Health checks
//! - Canvas operations (selection, prompts, variations, saving)

pub mod canvas;
pub mod health;
pub mod response;

use axum::Router;

pub use canvas::canvas_routes;
pub use health::health_routes;
pub use response::ApiResponse;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new().merge(canvas_routes())
}
