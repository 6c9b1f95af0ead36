//! Response envelope shared by all API handlers

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::future::Future;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

/// HTTP status for a canvas error
pub fn status_for(err: &easel_canvas::Error) -> StatusCode {
    use easel_canvas::Error;

    match err {
        Error::EntityNotFound(_) | Error::SavedImageNotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) | Error::DuplicateId(_) => StatusCode::BAD_REQUEST,
        Error::Upstream(_) => StatusCode::BAD_GATEWAY,
        Error::IdGeneration(_) | Error::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render an orchestrator result
pub fn respond<T: Serialize>(result: easel_canvas::Result<T>) -> Response {
    match result {
        Ok(data) => Json(ApiResponse::success(data)).into_response(),
        Err(e) => (
            status_for(&e),
            Json(ApiResponse::<()>::error(e.to_string()).with_code(e.code())),
        )
            .into_response(),
    }
}

/// Run an orchestrator operation on its own task.
///
/// A client that disconnects mid-request drops the handler future; the
/// operation itself keeps going so the canvas never stays half-updated.
pub async fn detached<T, F>(op: F) -> easel_canvas::Result<T>
where
    T: Send + 'static,
    F: Future<Output = easel_canvas::Result<T>> + Send + 'static,
{
    tokio::spawn(op).await?
}
