//! Session registry: the mapping from session id to live connection state.
//!
//! Pure data plus accessors; all cross-cutting behavior (admin singleton
//! clearing, push delivery) lives above this layer.

use std::time::{Duration, Instant};

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::dto::{player::PlayerSummary, unix_millis};

#[derive(Clone)]
/// Server-side record for one connected client (player or admin).
pub struct Session {
    /// Opaque unique token, stable for the connection's lifetime, never reused.
    pub id: String,
    /// Channel feeding the connection's dedicated writer task.
    pub tx: mpsc::UnboundedSender<Message>,
    /// Admin-controlled lock flag; enforced client-side, the server only
    /// relays it.
    pub locked: bool,
    /// Last-known snapshot reported by the client, overwritten wholesale.
    pub progress: Value,
    /// Optional display name.
    pub player_name: Option<String>,
    /// Whether this connection is the currently-authenticated admin channel.
    pub is_admin: bool,
    /// Connection creation timestamp.
    pub connected_at: OffsetDateTime,
    /// Updated on every inbound message; drives idle eviction.
    pub last_activity: Instant,
    /// Set when a liveness probe goes out, cleared on any inbound traffic.
    pub probe_pending: bool,
}

/// In-memory store of all live sessions, keyed by session id.
///
/// Iteration order is the underlying map's and is undefined; callers needing
/// determinism must sort explicitly.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Allocate a fresh session with default state and store it.
    pub fn create(&self, tx: mpsc::UnboundedSender<Message>) -> Session {
        let session = Session {
            id: Uuid::new_v4().simple().to_string(),
            tx,
            locked: false,
            progress: json!({}),
            player_name: None,
            is_admin: false,
            connected_at: OffsetDateTime::now_utc(),
            last_activity: Instant::now(),
            probe_pending: false,
        };
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Look up a session by id. Absence is a normal, recoverable case.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Push channel for a session, if it is still registered.
    pub fn sender(&self, id: &str) -> Option<mpsc::UnboundedSender<Message>> {
        self.sessions.get(id).map(|entry| entry.tx.clone())
    }

    /// Delete a session, returning its final state.
    ///
    /// Callers that may be removing the admin session must go through
    /// [`crate::state::AppState::remove_session`] so the admin singleton is
    /// cleared atomically with the removal.
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Update `last_activity` to now; called on every inbound message.
    pub fn touch(&self, id: &str) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.last_activity = Instant::now();
            entry.probe_pending = false;
        }
    }

    /// Set the display name for a session.
    pub fn set_name(&self, id: &str, name: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.player_name = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    /// Overwrite the progress snapshot wholesale, never merging fields.
    pub fn set_progress(&self, id: &str, progress: Value) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                if entry.player_name.is_none() {
                    if let Some(name) = progress.get("playerName").and_then(Value::as_str) {
                        entry.player_name = Some(name.to_string());
                    }
                }
                entry.progress = progress;
                true
            }
            None => false,
        }
    }

    /// Clear the progress snapshot back to empty.
    pub fn clear_progress(&self, id: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.progress = json!({});
                true
            }
            None => false,
        }
    }

    /// Set the lock flag, returning false when the session is unknown.
    pub fn set_locked(&self, id: &str, locked: bool) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.locked = locked;
                true
            }
            None => false,
        }
    }

    /// Mark or clear the admin flag on a session.
    pub fn set_admin(&self, id: &str, is_admin: bool) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.is_admin = is_admin;
                true
            }
            None => false,
        }
    }

    /// Flag a session as awaiting a probe reply.
    pub fn mark_probe(&self, id: &str) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.probe_pending = true;
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of session summaries, optionally excluding the admin channel.
    pub fn list(&self, exclude_admin: bool) -> Vec<PlayerSummary> {
        self.sessions
            .iter()
            .filter(|entry| !(exclude_admin && entry.is_admin))
            .map(|entry| PlayerSummary {
                session_id: entry.id.clone(),
                player_name: entry.player_name.clone(),
                locked: entry.locked,
                progress: entry.progress.clone(),
                connected_at: unix_millis(entry.connected_at),
                idle_seconds: entry.last_activity.elapsed().as_secs(),
            })
            .collect()
    }

    /// Snapshot of (id, channel) pairs for push-style iteration.
    pub fn channels(&self, exclude_admin: bool) -> Vec<(String, mpsc::UnboundedSender<Message>)> {
        self.sessions
            .iter()
            .filter(|entry| !(exclude_admin && entry.is_admin))
            .map(|entry| (entry.id.clone(), entry.tx.clone()))
            .collect()
    }

    /// Snapshot of probe bookkeeping for the liveness sweeper.
    pub fn probe_targets(&self) -> Vec<(String, mpsc::UnboundedSender<Message>, bool)> {
        self.sessions
            .iter()
            .map(|entry| (entry.id.clone(), entry.tx.clone(), entry.probe_pending))
            .collect()
    }

    /// Sessions whose `last_activity` is older than `timeout`.
    pub fn idle_sessions(&self, timeout: Duration) -> Vec<(String, mpsc::UnboundedSender<Message>)> {
        self.sessions
            .iter()
            .filter(|entry| entry.last_activity.elapsed() > timeout)
            .map(|entry| (entry.id.clone(), entry.tx.clone()))
            .collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
