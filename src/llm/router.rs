//! Intent routing on top of raw text generation
//!
//! Turns the provider's prompt-in/text-out contract into the classifier
//! contract the engine consumes: an intent tag, a best-effort parameter
//! extraction, and a composite-turn breakdown. The model's output is
//! untrusted; anything that does not parse cleanly degrades to the nearest
//! safe interpretation instead of erroring the turn.

use super::types::{Classification, GenerationOptions, SubTask, GENERAL_QUERY};
use super::{LlmError, LlmService, ModelRegistry};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const KNOWN_INTENTS: &[&str] = &[
    "send_email",
    "create_draft",
    "search_messages",
    "read_email",
    "create_calendar_event",
    "list_calendar_events",
    "create_document",
    "send_slack_message",
    "send_sms",
    GENERAL_QUERY,
];

/// Extraction schema per intent: (field, description) pairs fed to the model
fn parameter_schema(intent: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match intent {
        "send_email" | "create_draft" => Some(&[
            ("to", "email address"),
            ("subject", "email subject"),
            ("body", "email body content"),
        ]),
        "search_messages" => Some(&[("query", "search query")]),
        "read_email" => Some(&[("message_id", "message identifier")]),
        "create_calendar_event" => Some(&[
            ("summary", "event title"),
            ("start_time", "start date and time"),
            ("end_time", "end date and time"),
            ("description", "event description (optional)"),
            ("location", "event location (optional)"),
        ]),
        "list_calendar_events" => Some(&[
            ("time_min", "window start (optional)"),
            ("time_max", "window end (optional)"),
        ]),
        "create_document" => Some(&[
            ("title", "document title"),
            ("content", "document content (optional)"),
            ("topic", "document topic (optional)"),
            ("format", "output format (optional)"),
        ]),
        "send_slack_message" => Some(&[
            ("channel", "channel name or ID"),
            ("message", "message text"),
        ]),
        "send_sms" => Some(&[
            ("to_number", "phone number"),
            ("message", "SMS message text"),
        ]),
        _ => None,
    }
}

/// Routes user text to an intent and parameter bag via the default provider
pub struct LlmRouter {
    registry: Arc<ModelRegistry>,
}

impl LlmRouter {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    fn service(&self) -> Result<Arc<dyn LlmService>, LlmError> {
        self.registry
            .default()
            .ok_or_else(|| LlmError::unknown("no LLM provider configured"))
    }

    /// Classify one turn: composite breakdown first, then single-intent
    /// classification with schema-driven parameter extraction.
    pub async fn classify(&self, text: &str) -> Result<Classification, LlmError> {
        let service = self.service()?;

        if let Some(composite) = self.analyze_composite(&service, text).await {
            return Ok(composite);
        }

        let intent = self.classify_intent(&service, text).await?;
        let parameters = match parameter_schema(&intent) {
            Some(schema) => self.extract_parameters(&service, text, schema).await,
            None => Map::new(),
        };

        Ok(Classification {
            intent,
            parameters,
            subtasks: Vec::new(),
        })
    }

    /// Direct conversational generation
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.service()?
            .generate(prompt, &GenerationOptions::default())
            .await
    }

    async fn classify_intent(
        &self,
        service: &Arc<dyn LlmService>,
        text: &str,
    ) -> Result<String, LlmError> {
        let categories = KNOWN_INTENTS
            .iter()
            .map(|i| format!("- {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Classify the intent of the following user message into one of these categories:\n\
             {categories}\n\n\
             User message: {text}\n\n\
             Return only the intent category, nothing else."
        );

        let response = service.generate(&prompt, &GenerationOptions::precise()).await?;
        let normalized: String = response
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || *c == '_')
            .collect();

        if KNOWN_INTENTS.contains(&normalized.as_str()) {
            Ok(normalized)
        } else {
            tracing::debug!(raw = %response, "Unrecognized intent token, treating as general query");
            Ok(GENERAL_QUERY.to_string())
        }
    }

    /// Best-effort structured extraction. Never fails the turn: anything
    /// unparseable comes back as an empty bag and the executor reports the
    /// missing fields later.
    async fn extract_parameters(
        &self,
        service: &Arc<dyn LlmService>,
        text: &str,
        schema: &[(&str, &str)],
    ) -> Map<String, Value> {
        let fields = schema
            .iter()
            .map(|(name, desc)| format!("- {name}: {desc}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Extract the following fields from the text. Omit fields that are not present.\n\
             {fields}\n\n\
             Text: {text}\n\n\
             Return ONLY a JSON object, no other text."
        );

        let response = match service.generate(&prompt, &GenerationOptions::precise()).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Parameter extraction failed, continuing with empty bag");
                return Map::new();
            }
        };

        extract_json_object(&response)
            .and_then(|json| serde_json::from_str::<Value>(json).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Check whether the turn needs several tools run in order. Any failure
    /// here (provider error, unparseable JSON) means "not composite".
    async fn analyze_composite(
        &self,
        service: &Arc<dyn LlmService>,
        text: &str,
    ) -> Option<Classification> {
        let prompt = format!(
            "Analyze this request and determine if it requires multiple tools/actions:\n\n\
             Request: {text}\n\n\
             Available tools: send_email, create_calendar_event, create_document, \
             send_slack_message, send_sms, search_messages, list_calendar_events, \
             read_email, create_draft\n\n\
             If multiple tools are needed, break the request into separate tasks in \
             execution order. Return JSON in this EXACT format:\n\
             {{\"is_multi_tool\": true, \"tasks\": [{{\"tool\": \"create_document\", \
             \"parameters\": {{}}, \"order\": 1}}]}}\n\n\
             If only ONE tool (or none) is needed, return:\n\
             {{\"is_multi_tool\": false, \"tasks\": []}}\n\n\
             Return ONLY the JSON, no other text."
        );

        let response = match service.generate(&prompt, &GenerationOptions::precise()).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Composite analysis failed, assuming single intent");
                return None;
            }
        };

        let analysis: CompositeAnalysis = extract_json_object(&response)
            .and_then(|json| serde_json::from_str(json).ok())?;

        if !analysis.is_multi_tool || analysis.tasks.len() < 2 {
            return None;
        }

        let mut tasks = analysis.tasks;
        tasks.sort_by_key(|t| t.order);
        let subtasks = tasks
            .into_iter()
            .map(|t| SubTask {
                intent: map_tool_to_intent(&t.tool),
                parameters: t.parameters,
            })
            .collect();

        Some(Classification {
            intent: "multi_tool".to_string(),
            parameters: Map::new(),
            subtasks,
        })
    }
}

/// Map a tool name from the composite analysis onto an intent tag
fn map_tool_to_intent(tool: &str) -> String {
    if KNOWN_INTENTS.contains(&tool) {
        tool.to_string()
    } else {
        GENERAL_QUERY.to_string()
    }
}

/// Pull the outermost JSON object out of a model response that may be
/// wrapped in prose or code fences
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

#[derive(Debug, Deserialize)]
struct CompositeAnalysis {
    #[serde(default)]
    is_multi_tool: bool,
    #[serde(default)]
    tasks: Vec<CompositeTask>,
}

#[derive(Debug, Deserialize)]
struct CompositeTask {
    tool: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    order: u32,
}
