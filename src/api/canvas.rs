//! Canvas REST API
//!
//! Every route drives the single process-wide [`CanvasOrchestrator`]. Long
//! running operations (variations, saving) run detached from the request so
//! a dropped connection never leaves placeholders or latches behind.

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use easel_canvas::{CanvasOrchestrator, EntityId, ImageEntity, Position};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::response::{detached, respond, ApiResponse};

// ============================================================================
// Request / response types
// ============================================================================

/// Prompt edit
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Selection request
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub id: String,
}

/// Container resize
#[derive(Debug, Deserialize)]
pub struct ResizeRequest {
    pub width: f64,
    pub height: f64,
}

/// Variation request; the parent's own prompt is used when omitted
#[derive(Debug, Default, Deserialize)]
pub struct VariationsRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Place a catalog entry on the canvas
#[derive(Debug, Deserialize)]
pub struct PlaceSavedRequest {
    pub id: String,
}

/// Id of the entity an operation produced or touched
#[derive(Debug, Serialize)]
pub struct EntityRef {
    pub id: EntityId,
}

/// Result of a selection request
#[derive(Debug, Serialize)]
pub struct SelectResponse {
    /// False while a regeneration holds the selection
    pub selected: bool,
}

/// Result of a grid arrangement
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrangeResponse {
    pub required_height: f64,
}

/// Result of a catalog refresh
#[derive(Debug, Serialize)]
pub struct CatalogCount {
    pub count: usize,
}

// ============================================================================
// Routes
// ============================================================================

/// Create canvas routes
pub fn canvas_routes() -> Router {
    Router::new()
        .route("/api/v1/canvas", get(get_snapshot))
        .route("/api/v1/canvas/mount", post(mount))
        .route("/api/v1/canvas/prompt", post(update_prompt))
        .route("/api/v1/canvas/select", post(select))
        .route("/api/v1/canvas/deselect", post(deselect))
        .route("/api/v1/canvas/arrange", post(arrange))
        .route("/api/v1/canvas/resize", post(resize))
        .route("/api/v1/canvas/entities/:id", delete(delete_entity))
        .route("/api/v1/canvas/entities/:id/duplicate", post(duplicate))
        .route("/api/v1/canvas/entities/:id/variations", post(variations))
        .route("/api/v1/canvas/entities/:id/move", post(move_entity))
        .route("/api/v1/canvas/entities/:id/save", post(save))
        .route("/api/v1/canvas/saved", get(list_saved))
        .route("/api/v1/canvas/saved/refresh", post(refresh_saved))
        .route("/api/v1/canvas/saved/place", post(place_saved))
}

async fn entity_of(canvas: &CanvasOrchestrator, id: &EntityId) -> Option<ImageEntity> {
    canvas
        .snapshot()
        .await
        .entities
        .into_iter()
        .find(|e| &e.id == id)
}

// ============================================================================
// Handlers
// ============================================================================

/// Current canvas snapshot
async fn get_snapshot(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
) -> impl IntoResponse {
    Json(ApiResponse::success(canvas.snapshot().await))
}

/// Insert the initial placeholder
async fn mount(Extension(canvas): Extension<Arc<CanvasOrchestrator>>) -> impl IntoResponse {
    let mounted = canvas.mount().await;
    Json(ApiResponse::success(serde_json::json!({ "mounted": mounted })))
}

async fn update_prompt(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Json(request): Json<PromptRequest>,
) -> impl IntoResponse {
    canvas.update_prompt(request.prompt.clone()).await;
    Json(ApiResponse::success(serde_json::json!({ "prompt": request.prompt })))
}

async fn select(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Json(request): Json<SelectRequest>,
) -> impl IntoResponse {
    let id = EntityId::new(request.id);
    let result = canvas
        .select_entity(&id)
        .await
        .map(|selected| SelectResponse { selected });
    respond(result)
}

async fn deselect(Extension(canvas): Extension<Arc<CanvasOrchestrator>>) -> impl IntoResponse {
    canvas.deselect().await;
    Json(ApiResponse::success(SelectResponse { selected: false }))
}

async fn arrange(Extension(canvas): Extension<Arc<CanvasOrchestrator>>) -> impl IntoResponse {
    let required_height = canvas.arrange_grid().await;
    Json(ApiResponse::success(ArrangeResponse { required_height }))
}

async fn resize(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Json(request): Json<ResizeRequest>,
) -> impl IntoResponse {
    respond(canvas.resize_container(request.width, request.height).await)
}

async fn delete_entity(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = EntityId::new(id);
    let result = canvas.delete(&id).await.map(|()| EntityRef { id });
    respond(result)
}

async fn duplicate(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let source = EntityId::new(id);
    let result = detached(async move { canvas.duplicate(&source).await })
        .await
        .map(|id| EntityRef { id });
    respond(result)
}

async fn variations(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Path(id): Path<String>,
    request: Option<Json<VariationsRequest>>,
) -> impl IntoResponse {
    let parent_id = EntityId::new(id);
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let prompt = match request.prompt {
        Some(prompt) => prompt,
        None => entity_of(&canvas, &parent_id)
            .await
            .map(|e| e.prompt)
            .unwrap_or_default(),
    };
    debug!(parent_id = %parent_id, "variations requested over http");

    respond(detached(async move { canvas.generate_variations(&parent_id, &prompt).await }).await)
}

async fn move_entity(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Path(id): Path<String>,
    Json(position): Json<Position>,
) -> impl IntoResponse {
    let id = EntityId::new(id);
    respond(canvas.move_entity(&id, position).await)
}

/// Persist an entity's current image; any request body is ignored
async fn save(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = EntityId::new(id);
    let src = entity_of(&canvas, &id)
        .await
        .map(|e| e.src)
        .unwrap_or_default();

    let saved = id.clone();
    let result = detached(async move { canvas.save(&saved, &src).await })
        .await
        .map(|()| EntityRef { id });
    respond(result)
}

async fn list_saved(Extension(canvas): Extension<Arc<CanvasOrchestrator>>) -> impl IntoResponse {
    Json(ApiResponse::success(canvas.snapshot().await.saved_catalog))
}

async fn refresh_saved(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
) -> impl IntoResponse {
    let result = detached(async move { Ok(canvas.load_saved_catalog().await) })
        .await
        .map(|count| CatalogCount { count });
    respond(result)
}

async fn place_saved(
    Extension(canvas): Extension<Arc<CanvasOrchestrator>>,
    Json(request): Json<PlaceSavedRequest>,
) -> impl IntoResponse {
    let id = EntityId::new(request.id);
    let result = canvas.place_saved_by_id(&id).await.map(|id| EntityRef { id });
    respond(result)
}
