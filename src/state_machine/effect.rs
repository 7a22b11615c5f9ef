//! Effects produced by state transitions

use crate::resolver::ActionDescriptor;

/// What the runtime should do after a transition.
///
/// `Classify`, `Generate`, `Execute` and `ExecuteBatch` call out to
/// collaborators and feed their results back as events; `StorePending` and
/// `DiscardPending` mutate the session; `Respond` ends the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run the intent classifier + resolver over the turn text
    Classify { text: String },

    /// Produce a direct conversational reply
    Generate { prompt: String },

    /// Execute one action via the Action Executor
    Execute { action: ActionDescriptor },

    /// Execute an ordered batch of sub-actions, partial-failure tolerant
    ExecuteBatch { actions: Vec<ActionDescriptor> },

    /// Park an action on the session until the user confirms it
    StorePending { action: ActionDescriptor },

    /// Drop the pending action without executing it
    DiscardPending,

    /// Final user-visible response for this turn
    Respond(ResponseSpec),
}

/// The turn's user-visible outcome
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub text: String,
    pub action_required: bool,
    pub suggested_replies: Option<Vec<String>>,
}

impl ResponseSpec {
    /// Plain reply, nothing pending
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action_required: false,
            suggested_replies: None,
        }
    }

    /// Confirmation prompt with the stock reply choices
    pub fn confirmation(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action_required: true,
            suggested_replies: Some(vec![
                "yes".to_string(),
                "no".to_string(),
                "modify".to_string(),
            ]),
        }
    }
}

impl Effect {
    pub fn respond(text: impl Into<String>) -> Self {
        Effect::Respond(ResponseSpec::plain(text))
    }
}
