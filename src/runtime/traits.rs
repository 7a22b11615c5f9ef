//! Trait abstractions for runtime I/O
//!
//! These traits are the engine's collaborator seams; mock implementations
//! back the engine tests, production adapters live at the bottom.

use crate::llm::{Classification, LlmError, LlmRouter};
use crate::resolver::ActionDescriptor;
use crate::tools::{ExecutionError, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// Intent classification and text generation, as one collaborator.
///
/// Both calls are fallible and the engine degrades on failure: a classify
/// error reads as "no side effect requested", a generate error becomes a
/// canned apology. Neither ever fails a turn.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, LlmError>;
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Executes one resolved action against its external tool
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &ActionDescriptor) -> Result<String, ExecutionError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LanguageModel + ?Sized> LanguageModel for Arc<T> {
    async fn classify(&self, text: &str) -> Result<Classification, LlmError> {
        (**self).classify(text).await
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate(prompt).await
    }
}

#[async_trait]
impl<T: ActionExecutor + ?Sized> ActionExecutor for Arc<T> {
    async fn execute(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        (**self).execute(action).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

#[async_trait]
impl LanguageModel for LlmRouter {
    async fn classify(&self, text: &str) -> Result<Classification, LlmError> {
        LlmRouter::classify(self, text).await
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        LlmRouter::generate(self, prompt).await
    }
}

#[async_trait]
impl ActionExecutor for ToolRegistry {
    async fn execute(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        ToolRegistry::execute(self, action).await
    }
}
