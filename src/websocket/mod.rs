//! WebSocket module for Easel
//!
//! Provides real-time communication endpoints:
//! - /api/v1/canvas/ws - canvas snapshots and client actions

pub mod canvas;
pub mod protocol;

pub use canvas::canvas_ws_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/api/v1/canvas/ws", get(canvas_ws_handler))
}
