//! TTL-backed session store
//!
//! One record per conversation, keyed by session id. Every save refreshes
//! the expiry (sliding expiration keyed to last activity), so an active
//! conversation never expires mid-flow. A missing, expired, or malformed
//! record reads back as `None`: the caller starts a fresh session instead of
//! propagating corruption.

use crate::state_machine::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed, TTL-expiring storage for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// `None` is not an error; it means "start fresh"
    async fn get(&self, session_id: &str) -> StoreResult<Option<Session>>;

    /// Persist the record and reset its TTL
    async fn save(&self, session: &Session, ttl: Duration) -> StoreResult<()>;

    /// Administrative removal; never called by the state machine itself
    async fn delete(&self, session_id: &str) -> StoreResult<()>;

    /// Liveness probe for the health endpoint
    async fn health_check(&self) -> bool;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, session_id: &str) -> StoreResult<Option<Session>> {
        (**self).get(session_id).await
    }

    async fn save(&self, session: &Session, ttl: Duration) -> StoreResult<()> {
        (**self).save(session, ttl).await
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        (**self).delete(session_id).await
    }

    async fn health_check(&self) -> bool {
        (**self).health_check().await
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    body       TEXT NOT NULL,
    expires_at TEXT NOT NULL
);
";

/// SQLite-backed session store
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn expiry_from_ttl(ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        Utc::now() + ttl
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, session_id: &str) -> StoreResult<Option<Session>> {
        let row: Option<(String, String)> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt =
                conn.prepare("SELECT body, expires_at FROM sessions WHERE session_id = ?1")?;
            stmt.query_row(params![session_id], |row| Ok((row.get(0)?, row.get(1)?)))
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?
        };

        let Some((body, expires_at)) = row else {
            return Ok(None);
        };

        // Unparseable expiry counts as expired
        let expired = DateTime::parse_from_rfc3339(&expires_at)
            .map(|t| t.with_timezone(&Utc) <= Utc::now())
            .unwrap_or(true);
        if expired {
            self.delete(session_id).await?;
            return Ok(None);
        }

        match serde_json::from_str::<Session>(&body) {
            Ok(mut session) => {
                session.restore_invariants();
                Ok(Some(session))
            }
            Err(e) => {
                // Malformed record: start fresh rather than propagate
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Discarding malformed session record"
                );
                self.delete(session_id).await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session, ttl: Duration) -> StoreResult<()> {
        let body = serde_json::to_string(session)?;
        let expires_at = Self::expiry_from_ttl(ttl).to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO sessions (session_id, body, expires_at) VALUES (?1, ?2, ?3)",
            params![session.session_id, body, expires_at],
        )?;
        // Opportunistic sweep keeps the table from accumulating dead rows
        conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM sessions WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    }
}
