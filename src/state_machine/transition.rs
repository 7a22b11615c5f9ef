//! Pure state transition function
//!
//! Given the session as it stands and one event, produce the next status and
//! the effects the runtime must carry out. No I/O happens here; the same
//! inputs always produce the same outputs.

use super::{ConfirmationReply, Effect, Event, ResponseSpec, Session, SessionStatus};
use crate::resolver::confirmation_prompt;
use crate::tools::ActionOutcome;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub status: SessionStatus,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(status: SessionStatus) -> Self {
        Self {
            status,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    /// Confirmation was requested but nothing is awaiting confirmation.
    /// Client-correctable protocol misuse, not a server fault.
    #[error("no action is awaiting confirmation")]
    NoPendingAction,
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function.
///
/// The session is read, never written; status changes and pending-action
/// mutations travel back to the runtime as the returned status and the
/// `StorePending`/`DiscardPending` effects.
pub fn transition(session: &Session, event: Event) -> Result<TransitionResult, TransitionError> {
    match (session.status, event) {
        // ============================================================
        // Turn opening
        // ============================================================

        // A fresh request. Completed/Failed are transient and behave as
        // Pending if they ever reach here (defensive: restore_invariants
        // settles them on load).
        (
            SessionStatus::Pending | SessionStatus::Completed | SessionStatus::Failed,
            Event::UserTurn { text },
        ) => Ok(TransitionResult::new(SessionStatus::Pending).with_effect(Effect::Classify { text })),

        // A reply while an action awaits confirmation
        (SessionStatus::AwaitingConfirmation, Event::UserTurn { text }) => {
            match ConfirmationReply::parse(&text) {
                ConfirmationReply::Affirmative => {
                    let action = session
                        .pending_action
                        .clone()
                        .ok_or(TransitionError::NoPendingAction)?;
                    // Status holds until the executor reports back
                    Ok(TransitionResult::new(SessionStatus::AwaitingConfirmation)
                        .with_effect(Effect::Execute { action }))
                }
                ConfirmationReply::Negative => Ok(TransitionResult::new(SessionStatus::Pending)
                    .with_effect(Effect::DiscardPending)
                    .with_effect(Effect::respond(
                        "Action cancelled. Is there anything else I can help with?",
                    ))),
                ConfirmationReply::Modify => Ok(TransitionResult::new(SessionStatus::Pending)
                    .with_effect(Effect::DiscardPending)
                    .with_effect(Effect::respond(
                        "Okay, tell me the updated details and I'll set it up again.",
                    ))),
                // Anything else is a brand-new request: the stale pending
                // action is dropped and the text goes through normal
                // classification, so the session can never get stuck.
                ConfirmationReply::Other => Ok(TransitionResult::new(SessionStatus::Pending)
                    .with_effect(Effect::DiscardPending)
                    .with_effect(Effect::Classify { text })),
            }
        }

        // ============================================================
        // Resolver output
        // ============================================================
        (SessionStatus::Pending, Event::Resolved { text, actions }) => {
            let mut actions = actions;
            match actions.len() {
                // Conversational turn
                0 => Ok(TransitionResult::new(SessionStatus::Pending)
                    .with_effect(Effect::Generate { prompt: text })),
                1 => {
                    let action = actions.remove(0);
                    if action.needs_confirmation {
                        let prompt = confirmation_prompt(&action);
                        Ok(TransitionResult::new(SessionStatus::AwaitingConfirmation)
                            .with_effect(Effect::StorePending { action })
                            .with_effect(Effect::Respond(ResponseSpec::confirmation(prompt))))
                    } else {
                        Ok(TransitionResult::new(SessionStatus::Pending)
                            .with_effect(Effect::Execute { action }))
                    }
                }
                // Composite turn: ordered sub-actions run immediately,
                // without a per-sub-action confirmation gate
                _ => Ok(TransitionResult::new(SessionStatus::Pending)
                    .with_effect(Effect::ExecuteBatch { actions })),
            }
        }

        // ============================================================
        // Explicit confirmation endpoint
        // ============================================================
        (SessionStatus::AwaitingConfirmation, Event::ConfirmationDecision { confirmed }) => {
            if confirmed {
                let action = session
                    .pending_action
                    .clone()
                    .ok_or(TransitionError::NoPendingAction)?;
                Ok(TransitionResult::new(SessionStatus::AwaitingConfirmation)
                    .with_effect(Effect::Execute { action }))
            } else {
                Ok(TransitionResult::new(SessionStatus::Pending)
                    .with_effect(Effect::DiscardPending)
                    .with_effect(Effect::respond("Action cancelled.")))
            }
        }

        (_, Event::ConfirmationDecision { .. }) => Err(TransitionError::NoPendingAction),

        // ============================================================
        // Executor outcomes
        // ============================================================
        (
            SessionStatus::Pending | SessionStatus::AwaitingConfirmation,
            Event::Executed { outcomes },
        ) => {
            // At least one success marks the turn completed overall; a batch
            // never aborts because one independent sub-action failed.
            let status = if outcomes.iter().any(|o| o.success) {
                SessionStatus::Completed
            } else {
                SessionStatus::Failed
            };
            let text = summarize_outcomes(&outcomes);
            Ok(TransitionResult::new(status)
                .with_effect(Effect::DiscardPending)
                .with_effect(Effect::Respond(ResponseSpec::plain(text))))
        }

        (status, event) => Err(TransitionError::InvalidTransition(format!(
            "no transition from {status:?} with {event:?}"
        ))),
    }
}

/// Fold executor outcomes into one user-visible message.
///
/// Failure detail stays short: the executor's message is a one-line
/// diagnostic, never an internal error chain.
fn summarize_outcomes(outcomes: &[ActionOutcome]) -> String {
    match outcomes {
        [] => "I wasn't able to complete that action.".to_string(),
        [outcome] if outcome.success => {
            format!("I've completed the action: {}", outcome.detail)
        }
        [outcome] => format!(
            "I wasn't able to complete that action ({}). Please try again.",
            outcome.detail
        ),
        many => {
            let lines: Vec<String> = many
                .iter()
                .map(|o| {
                    if o.success {
                        format!("- {}: {}", o.action.describe(), o.detail)
                    } else {
                        format!("- {}: failed ({})", o.action.describe(), o.detail)
                    }
                })
                .collect();
            format!(
                "Here's how the {} requested actions went:\n{}",
                many.len(),
                lines.join("\n")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ActionDescriptor, ActionTarget};
    use serde_json::Map;

    fn action(confirm: bool) -> ActionDescriptor {
        ActionDescriptor {
            target: ActionTarget::Email,
            operation: "send".to_string(),
            parameters: Map::new(),
            needs_confirmation: confirm,
        }
    }

    fn session() -> Session {
        Session::new("s-1", "u-1")
    }

    fn awaiting_session() -> Session {
        let mut s = session();
        s.status = SessionStatus::AwaitingConfirmation;
        s.pending_action = Some(action(true));
        s
    }

    fn user_turn(text: &str) -> Event {
        Event::UserTurn {
            text: text.to_string(),
        }
    }

    #[test]
    fn pending_user_turn_classifies() {
        let result = transition(&session(), user_turn("hello")).unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(
            result.effects,
            vec![Effect::Classify {
                text: "hello".to_string()
            }]
        );
    }

    #[test]
    fn affirmative_reply_executes_pending() {
        let result = transition(&awaiting_session(), user_turn("yes")).unwrap();
        assert_eq!(result.status, SessionStatus::AwaitingConfirmation);
        assert_eq!(
            result.effects,
            vec![Effect::Execute {
                action: action(true)
            }]
        );
    }

    #[test]
    fn negative_reply_discards_without_executing() {
        let result = transition(&awaiting_session(), user_turn("no")).unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(result.effects[0], Effect::DiscardPending);
        assert!(matches!(result.effects[1], Effect::Respond(_)));
        assert!(!result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Execute { .. })));
    }

    #[test]
    fn modify_reply_discards_and_prompts() {
        let result = transition(&awaiting_session(), user_turn("modify")).unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(result.effects[0], Effect::DiscardPending);
        let Effect::Respond(spec) = &result.effects[1] else {
            panic!("expected respond effect");
        };
        assert!(spec.text.contains("updated details"));
    }

    #[test]
    fn unexpected_reply_falls_through_to_classification() {
        let result = transition(&awaiting_session(), user_turn("what's on my calendar")).unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(
            result.effects,
            vec![
                Effect::DiscardPending,
                Effect::Classify {
                    text: "what's on my calendar".to_string()
                }
            ]
        );
    }

    #[test]
    fn no_actions_resolved_generates_reply() {
        let event = Event::Resolved {
            text: "how are you".to_string(),
            actions: vec![],
        };
        let result = transition(&session(), event).unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(
            result.effects,
            vec![Effect::Generate {
                prompt: "how are you".to_string()
            }]
        );
    }

    #[test]
    fn confirmable_action_is_parked_with_suggested_replies() {
        let event = Event::Resolved {
            text: "email bob".to_string(),
            actions: vec![action(true)],
        };
        let result = transition(&session(), event).unwrap();
        assert_eq!(result.status, SessionStatus::AwaitingConfirmation);
        assert_eq!(
            result.effects[0],
            Effect::StorePending {
                action: action(true)
            }
        );
        let Effect::Respond(spec) = &result.effects[1] else {
            panic!("expected respond effect");
        };
        assert!(spec.action_required);
        let suggested = spec.suggested_replies.as_ref().unwrap();
        assert!(suggested.contains(&"yes".to_string()));
        assert!(suggested.contains(&"no".to_string()));
    }

    #[test]
    fn unconfirmed_action_executes_immediately() {
        let event = Event::Resolved {
            text: "search my inbox".to_string(),
            actions: vec![action(false)],
        };
        let result = transition(&session(), event).unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(
            result.effects,
            vec![Effect::Execute {
                action: action(false)
            }]
        );
    }

    #[test]
    fn multiple_actions_execute_as_a_batch() {
        let event = Event::Resolved {
            text: "make a doc and email it".to_string(),
            actions: vec![action(false), action(true)],
        };
        let result = transition(&session(), event).unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(
            result.effects,
            vec![Effect::ExecuteBatch {
                actions: vec![action(false), action(true)]
            }]
        );
    }

    #[test]
    fn confirmation_decision_true_executes() {
        let result = transition(
            &awaiting_session(),
            Event::ConfirmationDecision { confirmed: true },
        )
        .unwrap();
        assert_eq!(result.status, SessionStatus::AwaitingConfirmation);
        assert!(matches!(result.effects[0], Effect::Execute { .. }));
    }

    #[test]
    fn confirmation_decision_false_discards() {
        let result = transition(
            &awaiting_session(),
            Event::ConfirmationDecision { confirmed: false },
        )
        .unwrap();
        assert_eq!(result.status, SessionStatus::Pending);
        assert_eq!(result.effects[0], Effect::DiscardPending);
    }

    #[test]
    fn confirmation_without_pending_action_is_rejected() {
        let result = transition(&session(), Event::ConfirmationDecision { confirmed: true });
        assert!(matches!(result, Err(TransitionError::NoPendingAction)));
    }

    #[test]
    fn corrupt_awaiting_session_rejects_affirmative() {
        let mut s = session();
        s.status = SessionStatus::AwaitingConfirmation; // no pending action
        let result = transition(&s, user_turn("yes"));
        assert!(matches!(result, Err(TransitionError::NoPendingAction)));
    }

    #[test]
    fn successful_execution_completes() {
        let event = Event::Executed {
            outcomes: vec![ActionOutcome::success(action(false), "email sent")],
        };
        let result = transition(&session(), event).unwrap();
        assert_eq!(result.status, SessionStatus::Completed);
        let Effect::Respond(spec) = &result.effects[1] else {
            panic!("expected respond effect");
        };
        assert!(spec.text.contains("email sent"));
    }

    #[test]
    fn failed_execution_reports_generic_message() {
        let event = Event::Executed {
            outcomes: vec![ActionOutcome::failure(action(false), "connector timeout")],
        };
        let result = transition(&session(), event).unwrap();
        assert_eq!(result.status, SessionStatus::Failed);
        let Effect::Respond(spec) = &result.effects[1] else {
            panic!("expected respond effect");
        };
        assert!(spec.text.contains("wasn't able"));
    }

    #[test]
    fn partial_batch_failure_still_completes_and_reports_both() {
        let event = Event::Executed {
            outcomes: vec![
                ActionOutcome::success(action(false), "document created"),
                ActionOutcome::failure(action(true), "recipient rejected"),
            ],
        };
        let result = transition(&awaiting_session(), event).unwrap();
        assert_eq!(result.status, SessionStatus::Completed);
        let Effect::Respond(spec) = &result.effects[1] else {
            panic!("expected respond effect");
        };
        assert!(spec.text.contains("document created"));
        assert!(spec.text.contains("recipient rejected"));
    }
}
