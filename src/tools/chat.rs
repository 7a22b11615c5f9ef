//! Chat (Slack-style) connector

use super::{missing_params, unsupported, ConnectorClient, ExecutionError, Tool};
use crate::resolver::{ActionDescriptor, ActionParams, ActionTarget};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct ChatTool {
    connector: Arc<ConnectorClient>,
}

impl ChatTool {
    pub fn new(connector: Arc<ConnectorClient>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Tool for ChatTool {
    fn target(&self) -> ActionTarget {
        ActionTarget::Chat
    }

    async fn run(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        match (action.operation.as_str(), action.typed_params()) {
            ("send_message", ActionParams::ChatMessage(p)) => {
                missing_params(&[
                    ("channel", p.channel.is_some()),
                    ("message", p.message.is_some()),
                ])?;
                self.connector
                    .post(
                        "chat/send",
                        json!({
                            "channel": p.channel,
                            "message": p.message,
                        }),
                    )
                    .await
            }
            ("send_message", _) => Err(ExecutionError::MissingParameters(
                "parameter bag has the wrong shape".to_string(),
            )),
            _ => Err(unsupported(action)),
        }
    }
}
