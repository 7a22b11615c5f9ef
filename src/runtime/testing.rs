//! Mock implementations for testing
//!
//! These mocks enable engine tests without real I/O.

use crate::llm::{Classification, LlmError};
use crate::resolver::ActionDescriptor;
use crate::state_machine::Session;
use crate::store::{SessionStore, StoreResult};
use crate::tools::ExecutionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::traits::{ActionExecutor, LanguageModel};

// ============================================================================
// Mock language model
// ============================================================================

/// Returns queued classifications and generations; errors when a queue runs
/// dry so a test that forgot to script a call fails loudly.
pub struct MockLanguageModel {
    classifications: Mutex<VecDeque<Result<Classification, LlmError>>>,
    generations: Mutex<VecDeque<Result<String, LlmError>>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self {
            classifications: Mutex::new(VecDeque::new()),
            generations: Mutex::new(VecDeque::new()),
        }
    }

    pub fn queue_classification(&self, result: Result<Classification, LlmError>) {
        self.classifications.lock().unwrap().push_back(result);
    }

    pub fn queue_generation(&self, result: Result<String, LlmError>) {
        self.generations.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn classify(&self, _text: &str) -> Result<Classification, LlmError> {
        self.classifications
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("no mock classification queued")))
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("no mock generation queued")))
    }
}

// ============================================================================
// Mock action executor
// ============================================================================

/// Records every descriptor it is handed and replays queued results
pub struct MockExecutor {
    results: Mutex<VecDeque<Result<String, ExecutionError>>>,
    executions: Mutex<Vec<ActionDescriptor>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            executions: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_result(&self, result: Result<String, ExecutionError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn recorded(&self) -> Vec<ActionDescriptor> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActionExecutor for MockExecutor {
    async fn execute(&self, action: &ActionDescriptor) -> Result<String, ExecutionError> {
        self.executions.lock().unwrap().push(action.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExecutionError::Connector("no mock result queued".to_string())))
    }
}

// ============================================================================
// In-memory session store
// ============================================================================

/// TTL-honoring in-memory store for engine tests
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, (Session, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a record for assertions, ignoring expiry
    pub fn get_raw(&self, session_id: &str) -> Option<Session> {
        self.records
            .lock()
            .unwrap()
            .get(session_id)
            .map(|(session, _)| session.clone())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> StoreResult<Option<Session>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(session_id)
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(session, _)| session.clone()))
    }

    async fn save(&self, session: &Session, ttl: Duration) -> StoreResult<()> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        self.records.lock().unwrap().insert(
            session.session_id.clone(),
            (session.clone(), Utc::now() + ttl),
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        self.records.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
