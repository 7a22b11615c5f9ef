//! Events that drive a turn through the machine

use crate::resolver::ActionDescriptor;
use crate::tools::ActionOutcome;

/// Events consumed by the transition function.
///
/// `UserTurn` opens every turn; `Resolved` and `Executed` feed collaborator
/// results back in; `ConfirmationDecision` is the out-of-band confirm/reject
/// operation exposed to transports.
#[derive(Debug, Clone)]
pub enum Event {
    /// Raw user text for this turn
    UserTurn { text: String },

    /// Resolver output for the turn's text: zero, one, or several ordered
    /// action descriptors
    Resolved {
        text: String,
        actions: Vec<ActionDescriptor>,
    },

    /// Explicit confirm/reject of the pending action
    ConfirmationDecision { confirmed: bool },

    /// Executor outcomes, in sub-action order
    Executed { outcomes: Vec<ActionOutcome> },
}
