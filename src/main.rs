//! Concierge - conversational assistant backend
//!
//! Classifies free-form user messages into intents, gates side-effecting
//! actions behind explicit confirmation, and drives the conversation state
//! machine over HTTP and WebSocket transports.

mod api;
mod llm;
mod resolver;
mod runtime;
mod state_machine;
mod store;
mod tools;

use api::{create_router, AppState};
use llm::{LlmConfig, LlmRouter, ModelRegistry};
use runtime::TurnEngine;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::SqliteSessionStore;
use tools::{ConnectorClient, ToolRegistry};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("CONCIERGE_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.concierge/sessions.db")
    });

    let port: u16 = std::env::var("CONCIERGE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let session_ttl = Duration::from_secs(
        std::env::var("CONCIERGE_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600),
    );

    let action_timeout = Duration::from_secs(
        std::env::var("CONCIERGE_ACTION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
    );

    let connector_url = std::env::var("CONCIERGE_CONNECTOR_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8100".to_string());

    // Ensure store directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Session store
    tracing::info!(path = %db_path, "Opening session store");
    let store = SqliteSessionStore::open(&db_path)?;

    // LLM registry
    let llm_config = LlmConfig::from_env();
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));

    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set GEMINI_API_KEY or GROQ_API_KEY.");
    }

    // Collaborators are constructed here and passed by reference; nothing is
    // reached through ambient globals
    let router = Arc::new(LlmRouter::new(llm_registry.clone()));
    let connector = Arc::new(ConnectorClient::new(connector_url, action_timeout));
    let executor = Arc::new(ToolRegistry::new(connector, action_timeout));
    let engine = Arc::new(TurnEngine::new(
        store.clone(),
        router,
        executor,
        session_ttl,
    ));

    // Application state and router
    let state = AppState::new(engine, store, llm_registry);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Concierge server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
