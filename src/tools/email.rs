//! Email connector

use super::{missing_params, unsupported, ConnectorClient, ExecutionError, Tool};
use crate::resolver::{ActionDescriptor, ActionParams, ActionTarget};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct EmailTool {
    connector: Arc<ConnectorClient>,
}

impl EmailTool {
    pub fn new(connector: Arc<ConnectorClient>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Tool for EmailTool {
    fn target(&self) -> ActionTarget {
        ActionTarget::Email
    }

    async fn run(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        match (action.operation.as_str(), action.typed_params()) {
            ("send", ActionParams::Email(p)) => {
                missing_params(&[
                    ("to", p.to.is_some()),
                    ("subject", p.subject.is_some()),
                    ("body", p.body.is_some()),
                ])?;
                self.connector
                    .post(
                        "email/send",
                        json!({
                            "to": p.to,
                            "subject": p.subject,
                            "body": p.body,
                            "cc": p.cc,
                            "bcc": p.bcc,
                        }),
                    )
                    .await
            }
            ("create_draft", ActionParams::Email(p)) => {
                missing_params(&[("to", p.to.is_some())])?;
                self.connector
                    .post(
                        "email/draft",
                        json!({
                            "to": p.to,
                            "subject": p.subject,
                            "body": p.body,
                        }),
                    )
                    .await
            }
            ("search", ActionParams::EmailSearch(p)) => {
                missing_params(&[("query", p.query.is_some())])?;
                self.connector
                    .post(
                        "email/search",
                        json!({
                            "query": p.query,
                            "max_results": p.max_results.unwrap_or(10),
                        }),
                    )
                    .await
            }
            ("read", ActionParams::EmailRead(p)) => {
                missing_params(&[("message_id", p.message_id.is_some())])?;
                self.connector
                    .post("email/read", json!({ "message_id": p.message_id }))
                    .await
            }
            ("send" | "create_draft" | "search" | "read", _) => Err(
                ExecutionError::MissingParameters("parameter bag has the wrong shape".to_string()),
            ),
            _ => Err(unsupported(action)),
        }
    }
}
