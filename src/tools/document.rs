//! Document connector

use super::{missing_params, unsupported, ConnectorClient, ExecutionError, Tool};
use crate::resolver::{ActionDescriptor, ActionParams, ActionTarget};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct DocumentTool {
    connector: Arc<ConnectorClient>,
}

impl DocumentTool {
    pub fn new(connector: Arc<ConnectorClient>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Tool for DocumentTool {
    fn target(&self) -> ActionTarget {
        ActionTarget::Document
    }

    async fn run(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        match (action.operation.as_str(), action.typed_params()) {
            ("create", ActionParams::Document(p)) => {
                // Either an explicit title/content pair or a topic for the
                // connector to expand; one of the two must be present.
                let named = p.title.is_some() || p.topic.is_some();
                missing_params(&[("title or topic", named)])?;
                self.connector
                    .post(
                        "documents/create",
                        json!({
                            "title": p.title,
                            "content": p.content,
                            "topic": p.topic,
                            "format": p.format.as_deref().unwrap_or("doc"),
                        }),
                    )
                    .await
            }
            ("create", _) => Err(ExecutionError::MissingParameters(
                "parameter bag has the wrong shape".to_string(),
            )),
            _ => Err(unsupported(action)),
        }
    }
}
