//! Background maintenance loops: liveness probes, idle-session eviction, and
//! 2FA approval expiry.

use std::time::Duration;

use axum::{body::Bytes, extract::ws::Message};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};

use crate::{
    dto::ws::ServerMessage,
    services::admin_service::REASON_TIMEOUT,
    services::session_service::{notify_admin, push},
    state::SharedState,
};

/// How often the approval-expiry loop scans for stale requests.
const APPROVAL_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Run all maintenance loops until the process shuts down.
pub async fn run(state: SharedState) {
    tokio::join!(
        probe_loop(state.clone()),
        idle_loop(state.clone()),
        approval_loop(state),
    );
}

async fn probe_loop(state: SharedState) {
    let mut ticker = interval(state.config().probe_interval);
    loop {
        ticker.tick().await;
        probe_connections(&state).await;
    }
}

/// Ping every open connection; a connection that failed to answer the
/// previous probe is forcibly terminated. Covers half-open TCP connections
/// the transport layer didn't notice. Returns the number terminated.
pub async fn probe_connections(state: &SharedState) -> usize {
    let mut terminated = 0;
    for (id, tx, probe_pending) in state.sessions().probe_targets() {
        if probe_pending {
            warn!(id = %id, "liveness probe unanswered; terminating connection");
            evict(state, &id, &tx).await;
            terminated += 1;
        } else {
            state.sessions().mark_probe(&id);
            let _ = tx.send(Message::Ping(Bytes::new()));
        }
    }
    terminated
}

async fn idle_loop(state: SharedState) {
    let mut ticker = interval(state.config().idle_sweep_interval);
    loop {
        ticker.tick().await;
        evict_idle_sessions(&state).await;
    }
}

/// Evict sessions whose `last_activity` is stale even if the transport still
/// reports them open. Cleanup against clients that stop responding to probes
/// without ever closing the connection. Returns the number evicted.
pub async fn evict_idle_sessions(state: &SharedState) -> usize {
    let idle = state.sessions().idle_sessions(state.config().idle_timeout);
    let evicted = idle.len();
    for (id, tx) in idle {
        info!(id = %id, "evicting idle session");
        evict(state, &id, &tx).await;
    }
    evicted
}

/// Close the transport, remove the session, and tell the admin when the
/// departed session was a player. The socket's own teardown path cannot be
/// relied on here; a half-open connection may never run it.
async fn evict(state: &SharedState, id: &str, tx: &mpsc::UnboundedSender<Message>) {
    let _ = tx.send(Message::Close(None));
    let removed = state.remove_session(id).await;
    if removed.is_some_and(|session| !session.is_admin) {
        notify_admin(
            state,
            &ServerMessage::PlayerDisconnected {
                session_id: id.to_string(),
            },
        )
        .await;
    }
}

async fn approval_loop(state: SharedState) {
    let mut ticker = interval(APPROVAL_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        expire_approvals(&state);
    }
}

/// Expire approval requests the active admin never answered, notifying each
/// stuck candidate instead of leaving it pending forever. Returns the number
/// expired.
pub fn expire_approvals(state: &SharedState) -> usize {
    let mut expired = 0;
    for pending in state
        .admin()
        .expired_pending(state.config().approval_timeout)
    {
        info!(request = %pending.request_id, "expiring unanswered approval request");
        if let Some(channel) = &pending.channel {
            let _ = push(
                channel,
                &ServerMessage::AdminLoginResponse {
                    success: false,
                    reason: Some(REASON_TIMEOUT.to_string()),
                    session_id: None,
                },
            );
        }
        expired += 1;
    }
    expired
}
