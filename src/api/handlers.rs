//! HTTP request handlers

use super::types::{
    AgentReply, ChatRequest, ConfirmReply, ConfirmRequest, ErrorResponse, HealthResponse,
    HistoryResponse,
};
use super::ws::ws_handler;
use super::AppState;
use crate::runtime::EngineError;
use crate::store::SessionStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/sessions/:id/confirm", post(confirm))
        .route("/api/sessions/:id/history", get(history))
        .route("/ws/chat", get(ws_handler))
        .with_state(state)
}

// ============================================================
// Service banner and health
// ============================================================

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Concierge assistant backend",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_healthy = state.store.health_check().await;
    let llm_healthy = state.llm_registry.has_models();

    let (status, code) = if store_healthy && llm_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthResponse {
            status,
            store: store_healthy,
            llm: llm_healthy,
            timestamp: Utc::now(),
        }),
    )
}

// ============================================================
// Chat turn
// ============================================================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<AgentReply>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()));
    }

    let outcome = state
        .engine
        .handle_turn(req.session_id, &req.user_id, &req.message, req.metadata)
        .await?;

    Ok(Json(AgentReply {
        response: outcome.response,
        session_id: outcome.session_id,
        action_required: outcome.action_required,
        suggested_replies: outcome.suggested_replies,
    }))
}

// ============================================================
// Confirmation
// ============================================================

async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmReply>, AppError> {
    let outcome = state.engine.confirm_pending(&id, req.confirmed).await?;

    Ok(Json(ConfirmReply {
        message: outcome.response,
        result: outcome.result,
    }))
}

// ============================================================
// Transcript readback
// ============================================================

async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session = state
        .store
        .get(&id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("session not found: {id}")))?;

    let history = session
        .history
        .iter()
        .map(|record| serde_json::to_value(record).unwrap_or(serde_json::Value::Null))
        .collect();

    Ok(Json(HistoryResponse {
        session_id: session.session_id,
        history,
    }))
}

// ============================================================
// Error Handling
// ============================================================

pub(super) enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::SessionNotFound(_) => AppError::NotFound(e.to_string()),
            EngineError::InvalidState(_) => AppError::BadRequest(e.to_string()),
            EngineError::Store(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
