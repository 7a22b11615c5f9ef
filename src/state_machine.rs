//! Conversation state machine
//!
//! Pure state transitions for one conversational turn. All I/O (classifier,
//! generator, executor, store) happens in the runtime, driven by the effects
//! this module emits.

pub mod effect;
pub mod event;
pub mod state;
pub mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, ResponseSpec};
pub use event::Event;
pub use state::{ConfirmationReply, Role, Session, SessionStatus, TurnRecord};
pub use transition::{transition, TransitionError, TransitionResult};
