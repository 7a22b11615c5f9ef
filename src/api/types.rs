//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to process one chat turn
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Free-form caller context, merged onto the session record
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Reply for one chat turn
#[derive(Debug, Serialize)]
pub struct AgentReply {
    pub response: String,
    pub session_id: String,
    pub action_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_replies: Option<Vec<String>>,
}

/// Request to confirm or reject a pending action
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub confirmed: bool,
}

/// Reply for a confirm/reject call
#[derive(Debug, Serialize)]
pub struct ConfirmReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Transcript readback for one session
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub history: Vec<serde_json::Value>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: bool,
    pub llm: bool,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
