//! Turn runtime
//!
//! Owns the read-modify-write cycle for one conversational turn: load the
//! session, drive the state machine, run effects through the injected
//! collaborators, persist. One invocation per inbound turn; different
//! sessions proceed concurrently, a single turn's steps are sequential.

pub mod engine;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use engine::{ConfirmOutcome, EngineError, TurnEngine, TurnOutcome};
pub use traits::*;

use crate::llm::LlmRouter;
use crate::store::SqliteSessionStore;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// Type alias for the production engine wiring
pub type ProductionEngine = TurnEngine<SqliteSessionStore, Arc<LlmRouter>, Arc<ToolRegistry>>;
