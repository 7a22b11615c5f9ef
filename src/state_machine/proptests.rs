//! Property-based tests for the state machine
//!
//! Walks the machine through arbitrary turn sequences and checks the
//! invariants that must hold no matter what the classifier, resolver, or
//! executor produce.

use super::{transition, Effect, Event, Session, SessionStatus};
use crate::resolver::{ActionDescriptor, ActionTarget};
use crate::tools::ActionOutcome;
use proptest::prelude::*;
use serde_json::Map;

/// What the collaborators "return" for one simulated turn
#[derive(Debug, Clone)]
struct TurnScript {
    text: String,
    resolved: Vec<ActionDescriptor>,
    execution_succeeds: Vec<bool>,
}

fn action(target: ActionTarget, needs_confirmation: bool) -> ActionDescriptor {
    ActionDescriptor {
        target,
        operation: "op".to_string(),
        parameters: Map::new(),
        needs_confirmation,
    }
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("yes".to_string()),
        Just("no".to_string()),
        Just("modify".to_string()),
        Just("what's the weather".to_string()),
        Just("email bob".to_string()),
        "[a-z ]{0,40}",
    ]
}

fn arb_actions() -> impl Strategy<Value = Vec<ActionDescriptor>> {
    prop_oneof![
        Just(vec![]),
        Just(vec![action(ActionTarget::Email, true)]),
        Just(vec![action(ActionTarget::Email, false)]),
        Just(vec![
            action(ActionTarget::Document, false),
            action(ActionTarget::Email, true),
        ]),
        Just(vec![
            action(ActionTarget::Chat, true),
            action(ActionTarget::Sms, true),
            action(ActionTarget::Calendar, false),
        ]),
    ]
}

fn arb_turn() -> impl Strategy<Value = TurnScript> {
    (arb_text(), arb_actions(), proptest::collection::vec(any::<bool>(), 0..4)).prop_map(
        |(text, resolved, execution_succeeds)| TurnScript {
            text,
            resolved,
            execution_succeeds,
        },
    )
}

/// Drive one scripted turn the way the runtime does, without I/O.
/// Returns the number of transition steps taken.
fn run_turn(session: &mut Session, script: &TurnScript) -> usize {
    let mut event = Some(Event::UserTurn {
        text: script.text.clone(),
    });
    let mut steps = 0;
    let mut succeeds = script.execution_succeeds.iter().copied().chain(std::iter::repeat(true));

    while let Some(current) = event.take() {
        steps += 1;
        assert!(steps <= 8, "turn did not terminate");

        let result = transition(session, current).expect("scripted turns never misuse the machine");
        session.status = result.status;

        for effect in result.effects {
            match effect {
                Effect::StorePending { action } => session.pending_action = Some(action),
                Effect::DiscardPending => session.pending_action = None,
                Effect::Classify { text } => {
                    event = Some(Event::Resolved {
                        text,
                        actions: script.resolved.clone(),
                    });
                }
                Effect::Execute { action } => {
                    let ok = succeeds.next().unwrap_or(true);
                    let outcome = if ok {
                        ActionOutcome::success(action, "done")
                    } else {
                        ActionOutcome::failure(action, "failed")
                    };
                    event = Some(Event::Executed {
                        outcomes: vec![outcome],
                    });
                }
                Effect::ExecuteBatch { actions } => {
                    let outcomes = actions
                        .into_iter()
                        .map(|a| {
                            if succeeds.next().unwrap_or(true) {
                                ActionOutcome::success(a, "done")
                            } else {
                                ActionOutcome::failure(a, "failed")
                            }
                        })
                        .collect();
                    event = Some(Event::Executed { outcomes });
                }
                Effect::Generate { .. } | Effect::Respond(_) => {
                    // Turn ends with exactly one user-visible reply
                }
            }
        }
    }

    // The runtime settles transient annotations before persisting
    if matches!(
        session.status,
        SessionStatus::Completed | SessionStatus::Failed
    ) {
        session.status = SessionStatus::Pending;
    }

    steps
}

proptest! {
    /// After every turn: the pending-action invariant holds and the session
    /// rests in a state that can accept the next turn.
    #[test]
    fn invariant_holds_across_arbitrary_turns(scripts in proptest::collection::vec(arb_turn(), 1..25)) {
        let mut session = Session::new("prop-session", "prop-user");

        for script in &scripts {
            run_turn(&mut session, script);

            prop_assert!(session.invariant_holds());
            prop_assert!(matches!(
                session.status,
                SessionStatus::Pending | SessionStatus::AwaitingConfirmation
            ));
        }
    }

    /// A session that proposed an action and then receives "no" never
    /// reaches the executor and always returns to Pending.
    #[test]
    fn rejection_never_executes(text in arb_text()) {
        let mut session = Session::new("prop-session", "prop-user");

        // Park a confirmable action
        run_turn(&mut session, &TurnScript {
            text: "email bob".to_string(),
            resolved: vec![action(ActionTarget::Email, true)],
            execution_succeeds: vec![],
        });
        prop_assume!(session.status == SessionStatus::AwaitingConfirmation);

        let result = transition(&session, Event::UserTurn { text: "no".to_string() }).unwrap();
        prop_assert_eq!(result.status, SessionStatus::Pending);
        let has_execute_effect = result.effects.iter().any(|e| matches!(
            e,
            Effect::Execute { .. } | Effect::ExecuteBatch { .. }
        ));
        prop_assert!(!has_execute_effect);

        // Whatever the user says instead, the machine never errors from a
        // consistent awaiting state
        let _ = transition(&session, Event::UserTurn { text }).unwrap();
    }

    /// Statuses round-trip through serialization unchanged.
    #[test]
    fn status_serde_round_trip(idx in 0usize..4) {
        let statuses = [
            SessionStatus::Pending,
            SessionStatus::AwaitingConfirmation,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ];
        let status = statuses[idx];
        let json = serde_json::to_string(&status).unwrap();
        let back: SessionStatus = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, status);
    }
}
