use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::preview::{ListResult, PreviewApi, StartResult, StatusResult, StopResult};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub previews: PreviewApi,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"success": false, "error": message}))).into_response()
    }
}

fn error_message(error: Option<String>) -> String {
    error.unwrap_or_else(|| "Unknown error".to_string())
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/previews", get(list_previews))
        .route(
            "/api/previews/{business_id}",
            post(start_preview).delete(stop_preview),
        )
        .route("/api/previews/{business_id}/status", get(preview_status))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn start_preview(
    State(state): State<SharedState>,
    Path(business_id): Path<String>,
) -> Result<Json<StartResult>, ApiError> {
    let result = state.previews.start_preview(&business_id).await;
    if result.success {
        Ok(Json(result))
    } else {
        Err(ApiError::Internal(error_message(result.error)))
    }
}

async fn stop_preview(
    State(state): State<SharedState>,
    Path(business_id): Path<String>,
) -> Result<Json<StopResult>, ApiError> {
    let result = state.previews.stop_preview(&business_id).await;
    if result.success {
        Ok(Json(result))
    } else {
        Err(ApiError::NotFound(error_message(result.error)))
    }
}

async fn preview_status(
    State(state): State<SharedState>,
    Path(business_id): Path<String>,
) -> Result<Json<StatusResult>, ApiError> {
    let result = state.previews.get_preview_status(&business_id).await;
    if result.success {
        Ok(Json(result))
    } else {
        Err(ApiError::NotFound(error_message(result.error)))
    }
}

async fn list_previews(State(state): State<SharedState>) -> Json<ListResult> {
    Json(state.previews.list_all_previews().await)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
