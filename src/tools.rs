//! Tool connectors for side-effecting actions
//!
//! Each external tool category gets one stateless connector implementing
//! [`Tool`]. Parameter validation happens here, at execution time: the
//! resolver passes bags through verbatim, and a missing field fails loud
//! with a message naming it.

mod calendar;
mod chat;
mod document;
mod email;
mod sms;

pub use calendar::CalendarTool;
pub use chat::ChatTool;
pub use document::DocumentTool;
pub use email::EmailTool;
pub use sms::SmsTool;

use crate::resolver::{ActionDescriptor, ActionTarget};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure executing an action against an external tool.
///
/// Messages are one-line diagnostics safe to fold into a user-visible
/// transcript.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("missing required parameters: {0}")]
    MissingParameters(String),
    #[error("{0}")]
    Connector(String),
    #[error("operation timed out after {0}s")]
    Timeout(u64),
    #[error("no tool registered for target '{0}'")]
    UnknownTarget(String),
    #[error("unsupported operation '{operation}' for {target}")]
    UnsupportedOperation { target: String, operation: String },
}

/// Outcome of executing one action, successful or not
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub action: ActionDescriptor,
    pub success: bool,
    pub detail: String,
}

impl ActionOutcome {
    pub fn success(action: ActionDescriptor, detail: impl Into<String>) -> Self {
        Self {
            action,
            success: true,
            detail: detail.into(),
        }
    }

    pub fn failure(action: ActionDescriptor, detail: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            detail: detail.into(),
        }
    }
}

/// HTTP client for the tool connector service.
///
/// The real third-party plumbing (Gmail, Calendar, Slack, Twilio) lives
/// behind this one endpoint per tool; this service only speaks the
/// connector's request/result contract.
pub struct ConnectorClient {
    base_url: String,
    client: Client,
}

impl ConnectorClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// POST a JSON payload to `{base_url}/{path}` and return the connector's
    /// human-readable result string.
    pub async fn post(&self, path: &str, body: Value) -> Result<String, ExecutionError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExecutionError::Connector(format!("connector timeout calling {path}"))
                } else {
                    ExecutionError::Connector(format!("connector unreachable: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExecutionError::Connector(format!("failed to read connector reply: {e}")))?;

        if !status.is_success() {
            return Err(ExecutionError::Connector(format!(
                "connector returned {status} for {path}"
            )));
        }

        // Connector replies are `{"result": "..."}`; fall back to the raw
        // body for connectors that answer in plain text.
        let detail = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("result").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| text.trim().to_string());

        Ok(detail)
    }
}

/// A stateless connector for one external tool category
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which action target this tool serves
    fn target(&self) -> ActionTarget;

    /// Perform the side effect and return a human-readable result
    async fn run(&self, action: &ActionDescriptor) -> Result<String, ExecutionError>;
}

/// Collection of tool connectors, one per target, with a per-call timeout.
///
/// The timeout bounds a hung external call so it cannot pin a turn forever;
/// retries are deliberately not implemented here.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    call_timeout: Duration,
}

impl ToolRegistry {
    pub fn new(connector: Arc<ConnectorClient>, call_timeout: Duration) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(EmailTool::new(connector.clone())),
            Arc::new(CalendarTool::new(connector.clone())),
            Arc::new(DocumentTool::new(connector.clone())),
            Arc::new(ChatTool::new(connector.clone())),
            Arc::new(SmsTool::new(connector)),
        ];
        Self {
            tools,
            call_timeout,
        }
    }

    /// Execute an action through its target's tool
    pub async fn execute(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.target() == action.target)
            .ok_or_else(|| ExecutionError::UnknownTarget(action.target.as_str().to_string()))?;

        match tokio::time::timeout(self.call_timeout, tool.run(action)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::Timeout(self.call_timeout.as_secs())),
        }
    }
}

/// Collect the names of required-but-absent fields into one error
pub(crate) fn missing_params(fields: &[(&'static str, bool)]) -> Result<(), ExecutionError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExecutionError::MissingParameters(missing.join(", ")))
    }
}

pub(crate) fn unsupported(action: &ActionDescriptor) -> ExecutionError {
    ExecutionError::UnsupportedOperation {
        target: action.target.as_str().to_string(),
        operation: action.operation.clone(),
    }
}
