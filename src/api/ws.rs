//! WebSocket chat adapter
//!
//! Drives the same turn engine as the HTTP handlers over a long-lived
//! connection. Each connection gets a client id mapped to its active
//! session; the mapping is removed on disconnect and removal is idempotent.

use super::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Maps a connection's client id to its active session id
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, client_id: &str, session_id: &str) {
        self.connections
            .write()
            .await
            .insert(client_id.to_string(), session_id.to_string());
    }

    pub async fn session_for(&self, client_id: &str) -> Option<String> {
        self.connections.read().await.get(client_id).cloned()
    }

    /// Safe to call any number of times for the same client
    pub async fn disconnect(&self, client_id: &str) {
        self.connections.write().await.remove(client_id);
    }

    pub async fn active_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Wire frames
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsInbound {
    Chat { message: String },
    Ping,
    NewSession,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsOutbound {
    Connected {
        session_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    Reply {
        response: String,
        session_id: String,
        action_required: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggested_replies: Option<Vec<String>>,
        timestamp: DateTime<Utc>,
    },
    Status {
        status: String,
        timestamp: DateTime<Utc>,
    },
    SessionCreated {
        session_id: String,
    },
    Pong,
    Error {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl WsOutbound {
    fn error(message: impl Into<String>) -> Self {
        WsOutbound::Error {
            error: message.into(),
            timestamp: Utc::now(),
        }
    }

    fn status(status: impl Into<String>) -> Self {
        WsOutbound::Status {
            status: status.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WsQuery {
    user_id: String,
    #[serde(default)]
    session_id: Option<String>,
}

// ============================================================
// Handler
// ============================================================

pub(super) async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

async fn handle_socket(socket: WebSocket, query: WsQuery, state: AppState) {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();
    let client_id = format!("{}_{}", query.user_id, suffix);
    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    state.connections.register(&client_id, &session_id).await;
    let connection_count = state.connections.active_count().await;
    tracing::info!(
        client_id = %client_id,
        connections = connection_count,
        "WebSocket client connected"
    );

    let (mut sender, mut receiver) = socket.split();

    let connected = WsOutbound::Connected {
        session_id: session_id.clone(),
        user_id: query.user_id.clone(),
        timestamp: Utc::now(),
    };
    if !send(&mut sender, &connected).await {
        state.connections.disconnect(&client_id).await;
        return;
    }

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(client_id = %client_id, error = %e, "WebSocket receive error");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                let frame = match serde_json::from_str::<WsInbound>(&text) {
                    Ok(frame) => frame,
                    Err(_) => {
                        // Unknown or malformed frames get an error reply;
                        // the connection stays open
                        if !send(&mut sender, &WsOutbound::error("Invalid message format")).await {
                            break;
                        }
                        continue;
                    }
                };

                let keep_going = match frame {
                    WsInbound::Chat { message } => {
                        handle_chat(&state, &client_id, &query.user_id, message, &mut sender).await
                    }
                    WsInbound::Ping => send(&mut sender, &WsOutbound::Pong).await,
                    WsInbound::NewSession => {
                        let fresh = uuid::Uuid::new_v4().to_string();
                        state.connections.register(&client_id, &fresh).await;
                        send(&mut sender, &WsOutbound::SessionCreated { session_id: fresh }).await
                    }
                };
                if !keep_going {
                    break;
                }
            }
            Message::Close(_) => break,
            // Binary and protocol-level ping/pong frames are ignored
            _ => {}
        }
    }

    state.connections.disconnect(&client_id).await;
    let connection_count = state.connections.active_count().await;
    tracing::info!(
        client_id = %client_id,
        connections = connection_count,
        "WebSocket client disconnected"
    );
}

async fn handle_chat(
    state: &AppState,
    client_id: &str,
    user_id: &str,
    message: String,
    sender: &mut SplitSink<WebSocket, Message>,
) -> bool {
    if message.trim().is_empty() {
        return send(sender, &WsOutbound::error("Empty message")).await;
    }

    if !send(sender, &WsOutbound::status("processing")).await {
        return false;
    }

    let session_id = state.connections.session_for(client_id).await;
    match state
        .engine
        .handle_turn(session_id, user_id, &message, None)
        .await
    {
        Ok(outcome) => {
            // Keep the mapping current for engine-generated session ids
            state.connections.register(client_id, &outcome.session_id).await;
            send(
                sender,
                &WsOutbound::Reply {
                    response: outcome.response,
                    session_id: outcome.session_id,
                    action_required: outcome.action_required,
                    suggested_replies: outcome.suggested_replies,
                    timestamp: Utc::now(),
                },
            )
            .await
        }
        Err(e) => {
            tracing::error!(client_id = %client_id, error = %e, "Turn failed over WebSocket");
            send(sender, &WsOutbound::error(e.to_string())).await
        }
    }
}

/// Send one frame; false means the connection is gone
async fn send(sender: &mut SplitSink<WebSocket, Message>, frame: &WsOutbound) -> bool {
    let payload = match serde_json::to_string(frame) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize WebSocket frame");
            return false;
        }
    };
    sender.send(Message::Text(payload)).await.is_ok()
}
