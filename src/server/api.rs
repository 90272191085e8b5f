//! Axum handlers for `/api/*` routes.
//!
//! Every failure is turned into a JSON `{"error": ...}` body by [`ApiError`];
//! nothing a request does can take the process down.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::chat::ChatError;
use crate::error::AppError;

use super::AppState;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(super) enum ApiError {
    /// 400 — the request itself is wrong.
    BadRequest(String),
    /// 500 — the model or the store failed.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        if e.is_client_error() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Internal(format!("an error occurred: {e}"))
        }
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError::Internal(format!("an error occurred: {e}"))
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /api/chat
pub(super) async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!(error = %e, "rejected chat request body");
        ApiError::BadRequest(format!("invalid request body: {}", e.body_text()))
    })?;

    let message = req.message.unwrap_or_default();
    let reply = state
        .chat
        .send(&message, req.session_id.as_deref())
        .await?;

    Ok(Json(json!({
        "response": reply.response,
        "session_id": reply.session_id,
    })))
}

/// GET /api/history/{session_id}
pub(super) async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let history = state.chat.history(&session_id)?;
    Ok(Json(json!({ "history": history })))
}

/// POST /api/clear/{session_id}
pub(super) async fn clear(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.chat.clear(&session_id)?;
    Ok(Json(json!({ "message": "history cleared" })))
}

/// GET /api/health
pub(super) async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let store = state.chat.store();
    let sessions = store.len()?;
    Ok(Json(json!({
        "status": "ok",
        "provider": state.chat.provider().name(),
        "store": store.store_type(),
        "sessions": sessions,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderError;

    #[test]
    fn empty_message_maps_to_bad_request() {
        let resp = ApiError::from(ChatError::EmptyMessage).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_failure_maps_to_internal_with_description() {
        let err = ApiError::from(ChatError::Provider(ProviderError::Request("refused".into())));
        match err {
            ApiError::Internal(msg) => {
                assert!(msg.starts_with("an error occurred"));
                assert!(msg.contains("refused"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn store_failure_maps_to_internal() {
        let resp = ApiError::from(AppError::Session("lock poisoned".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
