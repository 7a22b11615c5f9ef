//! Calendar connector

use super::{missing_params, unsupported, ConnectorClient, ExecutionError, Tool};
use crate::resolver::{ActionDescriptor, ActionParams, ActionTarget};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub struct CalendarTool {
    connector: Arc<ConnectorClient>,
}

impl CalendarTool {
    pub fn new(connector: Arc<ConnectorClient>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Tool for CalendarTool {
    fn target(&self) -> ActionTarget {
        ActionTarget::Calendar
    }

    async fn run(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        match (action.operation.as_str(), action.typed_params()) {
            ("create_event", ActionParams::CalendarEvent(p)) => {
                missing_params(&[
                    ("summary", p.summary.is_some()),
                    ("start_time", p.start_time.is_some()),
                    ("end_time", p.end_time.is_some()),
                ])?;
                self.connector
                    .post(
                        "calendar/events",
                        json!({
                            "summary": p.summary,
                            "description": p.description,
                            "start_time": p.start_time,
                            "end_time": p.end_time,
                            "location": p.location,
                            "attendees": p.attendees,
                        }),
                    )
                    .await
            }
            ("list_events", ActionParams::CalendarList(p)) => {
                self.connector
                    .post(
                        "calendar/list",
                        json!({
                            "time_min": p.time_min,
                            "time_max": p.time_max,
                            "max_results": p.max_results.unwrap_or(10),
                        }),
                    )
                    .await
            }
            ("create_event" | "list_events", _) => Err(ExecutionError::MissingParameters(
                "parameter bag has the wrong shape".to_string(),
            )),
            _ => Err(unsupported(action)),
        }
    }
}
