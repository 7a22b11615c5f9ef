//! Action resolution
//!
//! Maps a classified intent and its extracted parameter bag onto a typed,
//! not-yet-executed action descriptor, and decides whether that action must
//! be confirmed by the user before execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// External tool category an action is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTarget {
    Email,
    Calendar,
    Document,
    Chat,
    Sms,
}

impl ActionTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionTarget::Email => "email",
            ActionTarget::Calendar => "calendar",
            ActionTarget::Document => "document",
            ActionTarget::Chat => "chat",
            ActionTarget::Sms => "sms",
        }
    }
}

/// A resolved, side-effecting operation awaiting execution.
///
/// `parameters` is whatever the classifier extracted; it is passed through
/// verbatim and only validated when the action is actually executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub target: ActionTarget,
    pub operation: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub needs_confirmation: bool,
}

impl ActionDescriptor {
    /// Typed view of the parameter bag for this (target, operation) pair.
    ///
    /// Extraction is tolerant: every field is optional, and a bag that does
    /// not deserialize at all falls back to `ActionParams::Untyped` so the
    /// failure surfaces at execution time with a useful message.
    pub fn typed_params(&self) -> ActionParams {
        let raw = Value::Object(self.parameters.clone());
        let parsed = match (self.target, self.operation.as_str()) {
            (ActionTarget::Email, "send" | "create_draft") => {
                serde_json::from_value(raw.clone()).map(ActionParams::Email)
            }
            (ActionTarget::Email, "search") => {
                serde_json::from_value(raw.clone()).map(ActionParams::EmailSearch)
            }
            (ActionTarget::Email, "read") => {
                serde_json::from_value(raw.clone()).map(ActionParams::EmailRead)
            }
            (ActionTarget::Calendar, "create_event") => {
                serde_json::from_value(raw.clone()).map(ActionParams::CalendarEvent)
            }
            (ActionTarget::Calendar, "list_events") => {
                serde_json::from_value(raw.clone()).map(ActionParams::CalendarList)
            }
            (ActionTarget::Document, "create") => {
                serde_json::from_value(raw.clone()).map(ActionParams::Document)
            }
            (ActionTarget::Chat, "send_message") => {
                serde_json::from_value(raw.clone()).map(ActionParams::ChatMessage)
            }
            (ActionTarget::Sms, "send") => {
                serde_json::from_value(raw.clone()).map(ActionParams::Sms)
            }
            _ => Err(serde::de::Error::custom("unknown operation")),
        };
        parsed.unwrap_or(ActionParams::Untyped(self.parameters.clone()))
    }

    /// One-line human description, used in confirmation prompts and logs
    pub fn describe(&self) -> String {
        format!("{}.{}", self.target.as_str(), self.operation)
    }
}

// ============================================================================
// Typed parameter views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailParams {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSearchParams {
    pub query: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReadParams {
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventParams {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarListParams {
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentParams {
    pub title: Option<String>,
    pub content: Option<String>,
    pub topic: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageParams {
    pub channel: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsParams {
    pub to_number: Option<String>,
    pub message: Option<String>,
}

/// Tagged parameter union per (target, operation), with an untyped fallback
/// for bags the free-form extractor produced in an unexpected shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionParams {
    Email(EmailParams),
    EmailSearch(EmailSearchParams),
    EmailRead(EmailReadParams),
    CalendarEvent(CalendarEventParams),
    CalendarList(CalendarListParams),
    Document(DocumentParams),
    ChatMessage(ChatMessageParams),
    Sms(SmsParams),
    Untyped(Map<String, Value>),
}

// ============================================================================
// Resolver
// ============================================================================

/// Static (intent -> target, operation, confirmation) table.
///
/// Unknown intents deliberately resolve to nothing: an unvetted intent must
/// never reach the executor. Anything irreversible or externally visible
/// defaults to requiring confirmation; reads and drafts do not.
const INTENT_TABLE: &[(&str, ActionTarget, &str, bool)] = &[
    ("send_email", ActionTarget::Email, "send", true),
    ("create_draft", ActionTarget::Email, "create_draft", false),
    ("search_messages", ActionTarget::Email, "search", false),
    ("read_email", ActionTarget::Email, "read", false),
    (
        "create_calendar_event",
        ActionTarget::Calendar,
        "create_event",
        true,
    ),
    (
        "list_calendar_events",
        ActionTarget::Calendar,
        "list_events",
        false,
    ),
    ("create_document", ActionTarget::Document, "create", false),
    ("send_slack_message", ActionTarget::Chat, "send_message", true),
    ("send_sms", ActionTarget::Sms, "send", true),
];

/// Pure mapping from classifier output to action descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionResolver;

impl ActionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a single intent. `None` means "no side effect requested" —
    /// either a conversational intent or one we do not recognize.
    pub fn resolve(
        &self,
        intent: &str,
        parameters: &Map<String, Value>,
    ) -> Option<ActionDescriptor> {
        let (_, target, operation, needs_confirmation) = INTENT_TABLE
            .iter()
            .find(|(name, _, _, _)| *name == intent)?;

        Some(ActionDescriptor {
            target: *target,
            operation: (*operation).to_string(),
            parameters: parameters.clone(),
            needs_confirmation: *needs_confirmation,
        })
    }

    /// Whether an intent's action would require confirmation, without
    /// building the descriptor. Unknown intents report `false` since they
    /// resolve to no action at all.
    #[allow(dead_code)] // Policy query, exercised in tests
    pub fn needs_confirmation(&self, intent: &str) -> bool {
        INTENT_TABLE
            .iter()
            .find(|(name, _, _, _)| *name == intent)
            .is_some_and(|(_, _, _, confirm)| *confirm)
    }
}

/// Build the user-facing confirmation prompt for a pending action.
///
/// Falls back to a generic prompt when the extracted parameters are missing
/// the fields the template wants — the prompt must never fail.
pub fn confirmation_prompt(action: &ActionDescriptor) -> String {
    let get = |key: &str| {
        action
            .parameters
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let prompt = match action.target {
        ActionTarget::Email => get("to").zip(get("subject")).map(|(to, subject)| {
            format!("I'll send an email to {to} with subject '{subject}'. Should I proceed?")
        }),
        ActionTarget::Calendar => {
            get("summary")
                .zip(get("start_time").zip(get("end_time")))
                .map(|(summary, (start, end))| {
                    format!(
                        "I'll create a calendar event '{summary}' from {start} to {end}. Should I proceed?"
                    )
                })
        }
        ActionTarget::Document => {
            get("title").map(|title| format!("I'll create a document titled '{title}'. Should I proceed?"))
        }
        ActionTarget::Chat => {
            get("channel").map(|channel| format!("I'll send a message to {channel}. Should I proceed?"))
        }
        ActionTarget::Sms => {
            get("to_number").map(|to| format!("I'll send an SMS to {to}. Should I proceed?"))
        }
    };

    prompt.unwrap_or_else(|| "Should I proceed with this action?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn send_email_requires_confirmation() {
        let resolver = ActionResolver::new();
        let action = resolver
            .resolve("send_email", &params(&[("to", "bob@x.com")]))
            .unwrap();

        assert_eq!(action.target, ActionTarget::Email);
        assert_eq!(action.operation, "send");
        assert!(action.needs_confirmation);
    }

    #[test]
    fn reads_execute_without_confirmation() {
        let resolver = ActionResolver::new();
        for intent in ["search_messages", "list_calendar_events", "read_email", "create_draft"] {
            let action = resolver.resolve(intent, &Map::new()).unwrap();
            assert!(
                !action.needs_confirmation,
                "{intent} should not require confirmation"
            );
        }
    }

    #[test]
    fn externally_visible_intents_require_confirmation() {
        let resolver = ActionResolver::new();
        for intent in ["send_email", "create_calendar_event", "send_slack_message", "send_sms"] {
            assert!(resolver.needs_confirmation(intent), "{intent}");
        }
    }

    #[test]
    fn conversational_and_unknown_intents_resolve_to_none() {
        let resolver = ActionResolver::new();
        assert!(resolver.resolve("general_query", &Map::new()).is_none());
        assert!(resolver.resolve("launch_missiles", &Map::new()).is_none());
        assert!(!resolver.needs_confirmation("launch_missiles"));
    }

    #[test]
    fn parameters_pass_through_verbatim() {
        let resolver = ActionResolver::new();
        let bag = params(&[("to", "bob@x.com"), ("unexpected", "kept")]);
        let action = resolver.resolve("send_email", &bag).unwrap();
        assert_eq!(action.parameters, bag);
    }

    #[test]
    fn typed_params_tolerate_missing_fields() {
        let resolver = ActionResolver::new();
        let action = resolver
            .resolve("send_email", &params(&[("to", "bob@x.com")]))
            .unwrap();

        match action.typed_params() {
            ActionParams::Email(email) => {
                assert_eq!(email.to.as_deref(), Some("bob@x.com"));
                assert!(email.subject.is_none());
                assert!(email.cc.is_empty());
            }
            other => panic!("expected email params, got {other:?}"),
        }
    }

    #[test]
    fn malformed_bag_falls_back_to_untyped() {
        let mut bag = Map::new();
        bag.insert("cc".to_string(), json!(42)); // wrong shape for a list
        let action = ActionDescriptor {
            target: ActionTarget::Email,
            operation: "send".to_string(),
            parameters: bag.clone(),
            needs_confirmation: true,
        };

        assert_eq!(action.typed_params(), ActionParams::Untyped(bag));
    }

    #[test]
    fn confirmation_prompt_uses_parameters_when_present() {
        let resolver = ActionResolver::new();
        let action = resolver
            .resolve(
                "send_email",
                &params(&[("to", "bob@x.com"), ("subject", "Hi")]),
            )
            .unwrap();

        let prompt = confirmation_prompt(&action);
        assert!(prompt.contains("bob@x.com"));
        assert!(prompt.contains("Hi"));
    }

    #[test]
    fn confirmation_prompt_survives_missing_parameters() {
        let action = ActionDescriptor {
            target: ActionTarget::Sms,
            operation: "send".to_string(),
            parameters: Map::new(),
            needs_confirmation: true,
        };

        assert_eq!(
            confirmation_prompt(&action),
            "Should I proceed with this action?"
        );
    }
}
