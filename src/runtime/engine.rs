//! The turn engine
//!
//! Drives the pure state machine for one turn, running its effects through
//! the injected collaborators. Collaborator failures never escape: each call
//! site has a defined fallback (degrade to conversation, fold into a failure
//! outcome, or surface as a client-correctable error).

use crate::llm::Classification;
use crate::resolver::{ActionDescriptor, ActionResolver};
use crate::state_machine::{
    transition, Effect, Event, ResponseSpec, Role, Session, SessionStatus, TransitionError,
};
use crate::store::{SessionStore, StoreError};
use crate::tools::ActionOutcome;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use super::traits::{ActionExecutor, LanguageModel};

/// Reply used when the generator (or the whole turn) is beyond saving
const FALLBACK_REPLY: &str =
    "I'm sorry, I'm having trouble processing that right now. Please try again.";

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub response: String,
    pub session_id: String,
    pub action_required: bool,
    pub suggested_replies: Option<Vec<String>>,
}

/// Result of an explicit confirm/reject call
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmOutcome {
    pub response: String,
    /// The executor's result string when an action actually ran and
    /// succeeded
    pub result: Option<String>,
}

/// Errors surfaced to transport adapters.
///
/// `SessionNotFound` and `InvalidState` are protocol misuse by the client
/// (confirming something that was never proposed, or an expired session);
/// `Store` is a server fault.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session {0} has no action awaiting confirmation")]
    InvalidState(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One engine per process, shared by all transports. Holds no per-session
/// state of its own; everything lives in the store between turns.
pub struct TurnEngine<S, L, X> {
    store: S,
    llm: L,
    executor: X,
    resolver: ActionResolver,
    session_ttl: Duration,
}

impl<S, L, X> TurnEngine<S, L, X>
where
    S: SessionStore,
    L: LanguageModel,
    X: ActionExecutor,
{
    pub fn new(store: S, llm: L, executor: X, session_ttl: Duration) -> Self {
        Self {
            store,
            llm,
            executor,
            resolver: ActionResolver::new(),
            session_ttl,
        }
    }

    /// Process one user turn. Generates a session id when the caller has
    /// none; a missing or unreadable stored record means a fresh session,
    /// never an error. Caller-supplied metadata is merged onto the session
    /// and otherwise opaque to the engine.
    pub async fn handle_turn(
        &self,
        session_id: Option<String>,
        user_id: &str,
        text: &str,
        metadata: Option<Map<String, Value>>,
    ) -> Result<TurnOutcome, EngineError> {
        let session_id = session_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut session = match self.store.get(&session_id).await {
            Ok(found) => found.unwrap_or_else(|| Session::new(&session_id, user_id)),
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Session load failed, starting fresh");
                Session::new(&session_id, user_id)
            }
        };

        if let Some(extra) = metadata {
            session.metadata.extend(extra);
        }

        // The user's raw text lands in the transcript before any processing
        session.push(Role::User, text);

        let event = Event::UserTurn {
            text: text.to_string(),
        };
        let spec = match self.drive(&mut session, event).await {
            Ok((spec, _)) => spec,
            Err(e) => {
                // The machine rejected the turn (only possible on a corrupt
                // record); reset to a safe state rather than surface it
                tracing::error!(session_id = %session_id, error = %e, "Turn failed in transition");
                session.status = SessionStatus::Pending;
                session.pending_action = None;
                ResponseSpec::plain(FALLBACK_REPLY)
            }
        };

        self.finish_turn(&mut session, Role::Assistant, &spec.text).await;

        Ok(TurnOutcome {
            response: spec.text,
            session_id,
            action_required: spec.action_required,
            suggested_replies: spec.suggested_replies,
        })
    }

    /// Confirm or reject the pending action of a session.
    pub async fn confirm_pending(
        &self,
        session_id: &str,
        confirmed: bool,
    ) -> Result<ConfirmOutcome, EngineError> {
        let mut session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        if session.status != SessionStatus::AwaitingConfirmation {
            return Err(EngineError::InvalidState(session_id.to_string()));
        }

        let event = Event::ConfirmationDecision { confirmed };
        let (spec, outcomes) = self
            .drive(&mut session, event)
            .await
            .map_err(|_| EngineError::InvalidState(session_id.to_string()))?;

        self.finish_turn(&mut session, Role::System, &spec.text).await;

        let result = outcomes
            .into_iter()
            .find(|o| o.success)
            .map(|o| o.detail);

        Ok(ConfirmOutcome {
            response: spec.text,
            result,
        })
    }

    /// Drive transitions and effects until the machine responds. Returns
    /// the response plus every executor outcome seen along the way.
    async fn drive(
        &self,
        session: &mut Session,
        event: Event,
    ) -> Result<(ResponseSpec, Vec<ActionOutcome>), TransitionError> {
        let mut event = event;
        let mut all_outcomes = Vec::new();

        loop {
            let result = transition(session, event)?;
            session.status = result.status;

            let mut next_event = None;
            let mut response = None;

            for effect in result.effects {
                match effect {
                    Effect::StorePending { action } => session.pending_action = Some(action),
                    Effect::DiscardPending => session.pending_action = None,
                    Effect::Classify { text } => {
                        let classification = match self.llm.classify(&text).await {
                            Ok(c) => c,
                            Err(e) => {
                                tracing::warn!(error = %e, "Classifier failed, treating as general query");
                                Classification::general_query()
                            }
                        };
                        let actions = self.resolve_actions(&classification);
                        next_event = Some(Event::Resolved { text, actions });
                    }
                    Effect::Generate { prompt } => {
                        let reply = match self.llm.generate(&prompt).await {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::warn!(error = %e, "Generator failed, degrading to apology");
                                FALLBACK_REPLY.to_string()
                            }
                        };
                        response = Some(ResponseSpec::plain(reply));
                    }
                    Effect::Execute { action } => {
                        let outcome = self.run_action(action).await;
                        all_outcomes.push(outcome.clone());
                        next_event = Some(Event::Executed {
                            outcomes: vec![outcome],
                        });
                    }
                    Effect::ExecuteBatch { actions } => {
                        // Strictly in order; one failure never aborts the rest
                        let mut outcomes = Vec::with_capacity(actions.len());
                        for action in actions {
                            outcomes.push(self.run_action(action).await);
                        }
                        all_outcomes.extend(outcomes.iter().cloned());
                        next_event = Some(Event::Executed { outcomes });
                    }
                    Effect::Respond(spec) => response = Some(spec),
                }
            }

            if let Some(spec) = response {
                return Ok((spec, all_outcomes));
            }
            match next_event {
                Some(next) => event = next,
                // The machine always ends a turn with a response; this is a
                // backstop, not a reachable path
                None => return Ok((ResponseSpec::plain(FALLBACK_REPLY), all_outcomes)),
            }
        }
    }

    /// Append the turn's single closing transcript entry, settle transient
    /// statuses, and persist unconditionally.
    async fn finish_turn(&self, session: &mut Session, role: Role, text: &str) {
        session.push(role, text);

        // Completed/Failed are annotations on the transcript; the stored
        // session is always ready for the next independent request
        if matches!(
            session.status,
            SessionStatus::Completed | SessionStatus::Failed
        ) {
            session.status = SessionStatus::Pending;
        }

        session.touch();
        if let Err(e) = self.store.save(session, self.session_ttl).await {
            // The user already got their answer; losing the persist is
            // logged, not surfaced
            tracing::error!(session_id = %session.session_id, error = %e, "Failed to persist session");
        }
    }

    fn resolve_actions(&self, classification: &Classification) -> Vec<ActionDescriptor> {
        if classification.subtasks.is_empty() {
            self.resolver
                .resolve(&classification.intent, &classification.parameters)
                .into_iter()
                .collect()
        } else {
            // Sub-intents that resolve to nothing are skipped, not errors
            classification
                .subtasks
                .iter()
                .filter_map(|t| self.resolver.resolve(&t.intent, &t.parameters))
                .collect()
        }
    }

    async fn run_action(&self, action: ActionDescriptor) -> ActionOutcome {
        match self.executor.execute(&action).await {
            Ok(detail) => {
                tracing::info!(action = %action.describe(), "Action executed");
                ActionOutcome::success(action, detail)
            }
            Err(e) => {
                tracing::warn!(action = %action.describe(), error = %e, "Action failed");
                ActionOutcome::failure(action, e.to_string())
            }
        }
    }
}
