//! HTTP and WebSocket API
//!
//! Both transports are thin, concurrency-agnostic wrappers: each inbound
//! turn becomes exactly one engine invocation.

mod handlers;
mod types;
mod ws;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;
pub use ws::ConnectionRegistry;

use crate::llm::ModelRegistry;
use crate::runtime::ProductionEngine;
use crate::store::SqliteSessionStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProductionEngine>,
    pub store: SqliteSessionStore,
    pub llm_registry: Arc<ModelRegistry>,
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new(
        engine: Arc<ProductionEngine>,
        store: SqliteSessionStore,
        llm_registry: Arc<ModelRegistry>,
    ) -> Self {
        Self {
            engine,
            store,
            llm_registry,
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }
}
