//! Session state types

use crate::resolver::ActionDescriptor;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a session currently is in the confirmation flow.
///
/// `Completed` and `Failed` are transient annotations produced while an
/// execution outcome is folded into the transcript; the machine returns the
/// session to `Pending` before the turn ends, so the conversation can carry
/// any number of independent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Pending,
    AwaitingConfirmation,
    Completed,
    Failed,
}

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One transcript entry. The history is append-only; entries are never
/// rewritten or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The unit of conversational continuity, persisted per turn in the
/// TTL-backed session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub pending_action: Option<ActionDescriptor>,
    #[serde(default)]
    pub history: Vec<TurnRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            status: SessionStatus::Pending,
            pending_action: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: Map::new(),
        }
    }

    /// Append a transcript entry
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(TurnRecord {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    /// Advance `updated_at`. Must move forward on every mutation, even when
    /// two mutations land within the clock's resolution.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// `AwaitingConfirmation` holds exactly when a pending action exists
    #[allow(dead_code)] // Checked after every transition in tests
    pub fn invariant_holds(&self) -> bool {
        (self.status == SessionStatus::AwaitingConfirmation) == self.pending_action.is_some()
    }

    /// Re-establish cross-field invariants on a record read back from the
    /// store. A broken record is repaired rather than propagated: a stray
    /// pending action is dropped, a transient status is settled back to
    /// `Pending`.
    pub fn restore_invariants(&mut self) {
        match self.status {
            SessionStatus::AwaitingConfirmation if self.pending_action.is_none() => {
                self.status = SessionStatus::Pending;
            }
            SessionStatus::Completed | SessionStatus::Failed => {
                self.pending_action = None;
                self.status = SessionStatus::Pending;
            }
            _ => {
                if self.status == SessionStatus::Pending {
                    self.pending_action = None;
                }
            }
        }
    }
}

/// How a user reply is read while an action awaits confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirmative,
    Negative,
    Modify,
    /// Anything else: treated as a brand-new request, never as a reason to
    /// keep the user stuck at the confirmation gate
    Other,
}

impl ConfirmationReply {
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();
        match normalized.as_str() {
            "yes" | "y" | "confirm" | "ok" | "okay" | "sure" | "go ahead" | "do it" => {
                ConfirmationReply::Affirmative
            }
            "no" | "n" | "cancel" | "stop" => ConfirmationReply::Negative,
            "modify" | "edit" | "change" => ConfirmationReply::Modify,
            _ => ConfirmationReply::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ActionDescriptor, ActionTarget};

    fn pending_action() -> ActionDescriptor {
        ActionDescriptor {
            target: ActionTarget::Email,
            operation: "send".to_string(),
            parameters: Map::new(),
            needs_confirmation: true,
        }
    }

    #[test]
    fn new_session_starts_pending_and_consistent() {
        let session = Session::new("s-1", "u-1");
        assert_eq!(session.status, SessionStatus::Pending);
        assert!(session.pending_action.is_none());
        assert!(session.invariant_holds());
    }

    #[test]
    fn touch_advances_even_when_clock_does_not() {
        let mut session = Session::new("s-1", "u-1");
        let mut last = session.updated_at;
        for _ in 0..100 {
            session.touch();
            assert!(session.updated_at > last);
            last = session.updated_at;
        }
    }

    #[test]
    fn restore_repairs_awaiting_without_action() {
        let mut session = Session::new("s-1", "u-1");
        session.status = SessionStatus::AwaitingConfirmation;
        session.restore_invariants();
        assert_eq!(session.status, SessionStatus::Pending);
        assert!(session.invariant_holds());
    }

    #[test]
    fn restore_settles_transient_statuses() {
        for status in [SessionStatus::Completed, SessionStatus::Failed] {
            let mut session = Session::new("s-1", "u-1");
            session.status = status;
            session.pending_action = Some(pending_action());
            session.restore_invariants();
            assert_eq!(session.status, SessionStatus::Pending);
            assert!(session.pending_action.is_none());
        }
    }

    #[test]
    fn restore_drops_stray_pending_action() {
        let mut session = Session::new("s-1", "u-1");
        session.pending_action = Some(pending_action());
        session.restore_invariants();
        assert!(session.pending_action.is_none());
        assert!(session.invariant_holds());
    }

    #[test]
    fn confirmation_reply_tokens() {
        for text in ["yes", "Y", " CONFIRM ", "ok", "sure"] {
            assert_eq!(ConfirmationReply::parse(text), ConfirmationReply::Affirmative);
        }
        for text in ["no", "N", "cancel", "stop"] {
            assert_eq!(ConfirmationReply::parse(text), ConfirmationReply::Negative);
        }
        for text in ["modify", "edit", "change"] {
            assert_eq!(ConfirmationReply::parse(text), ConfirmationReply::Modify);
        }
        for text in ["yes please send it", "what's the weather", ""] {
            assert_eq!(ConfirmationReply::parse(text), ConfirmationReply::Other);
        }
    }

    #[test]
    fn session_serde_round_trip() {
        let mut session = Session::new("s-1", "u-1");
        session.push(Role::User, "hello");
        session.status = SessionStatus::AwaitingConfirmation;
        session.pending_action = Some(pending_action());

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
