//! SMS connector

use super::{missing_params, unsupported, ConnectorClient, ExecutionError, Tool};
use crate::resolver::{ActionDescriptor, ActionParams, ActionTarget};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct SmsTool {
    connector: Arc<ConnectorClient>,
}

impl SmsTool {
    pub fn new(connector: Arc<ConnectorClient>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Tool for SmsTool {
    fn target(&self) -> ActionTarget {
        ActionTarget::Sms
    }

    async fn run(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        match (action.operation.as_str(), action.typed_params()) {
            ("send", ActionParams::Sms(p)) => {
                missing_params(&[
                    ("to_number", p.to_number.is_some()),
                    ("message", p.message.is_some()),
                ])?;
                self.connector
                    .post(
                        "sms/send",
                        json!({
                            "to_number": p.to_number,
                            "message": p.message,
                        }),
                    )
                    .await
            }
            ("send", _) => Err(ExecutionError::MissingParameters(
                "parameter bag has the wrong shape".to_string(),
            )),
            _ => Err(unsupported(action)),
        }
    }
}
