//! Admin command dispatch: login and takeover, the 2FA approval flow, and
//! the lock/reset/start/stop commands pushed to player sessions.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{LoginResponse, LoginStatus, TakeoverResponse},
        player::PlayerSummary,
        ws::ServerMessage,
    },
    error::ServiceError,
    services::session_service::{notify_admin, push},
    state::{Candidate, LoginDecision, SharedState},
};

/// Deferral reason sent to a candidate parked behind the 2FA flow.
pub(crate) const REASON_PENDING: &str = "pending_approval";
/// Failure reason for a wrong shared secret.
pub(crate) const REASON_INVALID_CREDENTIALS: &str = "invalid_credentials";
/// Failure reason when the active admin denies a candidate.
pub(crate) const REASON_DENIED: &str = "admin_denied";
/// Failure reason when an approval request expires unanswered.
pub(crate) const REASON_TIMEOUT: &str = "admin_timeout";
/// Failure reason for a handshake without a matching identity or grant.
pub(crate) const REASON_UNAUTHORIZED: &str = "unauthorized";

fn login_failure(reason: &str) -> ServerMessage {
    ServerMessage::AdminLoginResponse {
        success: false,
        reason: Some(reason.to_string()),
        session_id: None,
    }
}

fn login_success(session_id: Option<String>) -> ServerMessage {
    ServerMessage::AdminLoginResponse {
        success: true,
        reason: None,
        session_id,
    }
}

/// Handle an admin login attempt arriving on the REST surface.
///
/// Never an HTTP error: wrong credentials come back as a `rejected` status so
/// the dashboard can render the outcome uniformly.
pub async fn rest_login(state: &SharedState, password: &str) -> LoginResponse {
    if !state.config().verify_password(password) {
        return LoginResponse {
            status: LoginStatus::Rejected,
            session_id: None,
            request_id: None,
        };
    }

    let decision = state
        .admin()
        .begin_login(Candidate {
            session_id: None,
            player_name: None,
            channel: None,
        })
        .await;

    match decision {
        LoginDecision::Accepted(admin_id) => {
            info!(admin = %admin_id, "admin logged in via REST");
            LoginResponse {
                status: LoginStatus::Accepted,
                session_id: Some(admin_id.to_string()),
                request_id: None,
            }
        }
        LoginDecision::Pending(request_id) => {
            forward_two_factor_request(state, request_id, None, None).await;
            LoginResponse {
                status: LoginStatus::Pending,
                session_id: None,
                request_id: Some(request_id),
            }
        }
    }
}

/// Handle an admin login attempt arriving over a persistent channel.
///
/// Outcomes are pushed back as `admin_login_response` events rather than
/// returned, matching the browser client's expectations.
pub async fn websocket_login(
    state: &SharedState,
    session_id: &str,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    password: &str,
) {
    if !state.config().verify_password(password) {
        warn!(id = %session_id, "admin login with wrong password");
        let _ = push(outbound_tx, &login_failure(REASON_INVALID_CREDENTIALS));
        return;
    }

    // A repeated login from the already-bound admin connection is answered
    // with its existing identity instead of being parked behind itself.
    if let Some(active) = state.admin().active().await {
        if active.session_id.as_deref() == Some(session_id) {
            let _ = push(outbound_tx, &login_success(Some(active.id.to_string())));
            return;
        }
    }

    let player_name = state
        .sessions()
        .get(session_id)
        .and_then(|session| session.player_name);

    let decision = state
        .admin()
        .begin_login(Candidate {
            session_id: Some(session_id.to_string()),
            player_name: player_name.clone(),
            channel: Some(outbound_tx.clone()),
        })
        .await;

    match decision {
        LoginDecision::Accepted(admin_id) => {
            state.sessions().set_admin(session_id, true);
            info!(id = %session_id, admin = %admin_id, "admin logged in");
            let _ = push(outbound_tx, &login_success(Some(admin_id.to_string())));
        }
        LoginDecision::Pending(request_id) => {
            info!(id = %session_id, request = %request_id, "admin login parked for approval");
            forward_two_factor_request(
                state,
                request_id,
                Some(session_id.to_string()),
                player_name,
            )
            .await;
            let _ = push(outbound_tx, &login_failure(REASON_PENDING));
        }
    }
}

/// Route a freshly created approval request to the active admin's channel.
///
/// When the admin has no bound channel the request stays recorded but will
/// only be resolved once the admin reconnects; a known limitation of the
/// single-channel design.
async fn forward_two_factor_request(
    state: &SharedState,
    request_id: Uuid,
    session_id: Option<String>,
    player_name: Option<String>,
) {
    notify_admin(
        state,
        &ServerMessage::TwoFactorRequest {
            request_id,
            session_id,
            player_name,
        },
    )
    .await;
}

/// Complete the admin handshake over a persistent channel.
///
/// Three ways in: a claimed HTTP-issued admin id (bind), a consumed 2FA
/// grant (approved candidate), or a no-op for the already-bound connection.
pub async fn complete_handshake(
    state: &SharedState,
    session_id: &str,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    claimed: Option<String>,
) {
    if let Some(claimed) = claimed {
        match state
            .admin()
            .bind_channel(&claimed, session_id, outbound_tx.clone())
            .await
        {
            Ok((admin_id, displaced)) => {
                if let Some(old_session) = displaced {
                    state.sessions().set_admin(&old_session, false);
                }
                state.sessions().set_admin(session_id, true);
                info!(id = %session_id, admin = %admin_id, "admin channel bound");
                let _ = push(outbound_tx, &login_success(Some(admin_id.to_string())));
            }
            Err(err) => {
                warn!(id = %session_id, error = %err, "admin handshake rejected");
                let _ = push(outbound_tx, &login_failure(REASON_UNAUTHORIZED));
            }
        }
        return;
    }

    if state.admin().take_grant(session_id) {
        let (admin_id, previous) = state
            .admin()
            .install(Some(session_id.to_string()), Some(outbound_tx.clone()))
            .await;
        if let Some(previous) = previous {
            if let Some(old_session) = previous.session_id {
                if old_session != session_id {
                    state.sessions().set_admin(&old_session, false);
                }
            }
        }
        state.sessions().set_admin(session_id, true);
        info!(id = %session_id, admin = %admin_id, "approved candidate installed as admin");
        let _ = push(outbound_tx, &login_success(Some(admin_id.to_string())));
        return;
    }

    let already_bound = state
        .admin()
        .active()
        .await
        .is_some_and(|active| active.session_id.as_deref() == Some(session_id));
    if already_bound {
        return;
    }

    warn!(id = %session_id, "handshake without grant or identity");
    let _ = push(outbound_tx, &login_failure(REASON_UNAUTHORIZED));
}

/// Bind an open WebSocket connection as the admin channel for an HTTP-issued
/// admin id.
pub async fn bind_channel(
    state: &SharedState,
    claimed: &str,
    connection_id: &str,
) -> Result<(), ServiceError> {
    let tx = state
        .sessions()
        .sender(connection_id)
        .ok_or_else(|| ServiceError::NotFound(format!("connection `{connection_id}`")))?;

    let (admin_id, displaced) = state
        .admin()
        .bind_channel(claimed, connection_id, tx)
        .await?;
    if let Some(old_session) = displaced {
        state.sessions().set_admin(&old_session, false);
    }
    state.sessions().set_admin(connection_id, true);
    info!(id = %connection_id, admin = %admin_id, "admin channel bound via REST");
    Ok(())
}

/// Displace the current admin unconditionally and install the caller.
///
/// Privileged and disruptive: the escape hatch for a stuck or abandoned admin
/// session. Bypasses the approval flow entirely.
pub async fn force_takeover(
    state: &SharedState,
    password: &str,
) -> Result<TakeoverResponse, ServiceError> {
    if !state.config().verify_password(password) {
        return Err(ServiceError::InvalidCredentials);
    }

    let (admin_id, previous) = state.admin().install(None, None).await;

    if let Some(previous) = previous {
        if let Some(channel) = &previous.channel {
            let _ = push(
                channel,
                &ServerMessage::ForceLogout {
                    message: "Your admin session was taken over".to_string(),
                },
            );
        }
        if let Some(old_session) = previous.session_id {
            state.remove_session(&old_session).await;
        }
        info!(old = %previous.id, new = %admin_id, "admin takeover");
    } else {
        info!(new = %admin_id, "admin takeover with no prior admin");
    }

    Ok(TakeoverResponse {
        session_id: admin_id.to_string(),
    })
}

/// Resolve one pending 2FA approval.
///
/// A candidate that disconnected before resolution is handled gracefully:
/// delivery no-ops, the pending entry is still cleaned up.
pub async fn approve(
    state: &SharedState,
    claimed: &str,
    request_id: Uuid,
    approved: bool,
) -> Result<(), ServiceError> {
    state.admin().authorize(claimed).await?;
    let pending = state.admin().resolve(request_id)?;

    if approved {
        // The grant only lifts the block; the candidate still completes the
        // normal handshake to become the admin.
        if let Some(candidate_session) = &pending.session_id {
            if state.sessions().get(candidate_session).is_some() {
                state.admin().grant(candidate_session);
            }
        }
        if let Some(channel) = &pending.channel {
            let _ = push(channel, &login_success(None));
        }
        info!(request = %request_id, "admin approved candidate");
    } else {
        if let Some(channel) = &pending.channel {
            let _ = push(channel, &login_failure(REASON_DENIED));
        }
        info!(request = %request_id, "admin denied candidate");
    }

    Ok(())
}

/// Push an event to every open session, removing sessions whose transport is
/// gone. Best effort by design; returns the number of sessions reached.
pub async fn broadcast(state: &SharedState, message: &ServerMessage) -> usize {
    let channels = state.sessions().channels(false);
    let mut reached = 0;
    let mut dead = Vec::new();

    for (id, tx) in channels {
        match push(&tx, message) {
            Ok(()) => reached += 1,
            Err(_) => dead.push(id),
        }
    }

    for id in dead {
        warn!(id = %id, "removing session with closed channel during broadcast");
        state.remove_session(&id).await;
    }

    reached
}

/// Start the game and notify every session.
pub async fn start_game(state: &SharedState, claimed: &str) -> Result<(), ServiceError> {
    let admin_id = state.admin().authorize(claimed).await?;
    state.start_game(&admin_id).await;
    info!(admin = %admin_id, "game started");
    broadcast(state, &ServerMessage::GameStarted).await;
    Ok(())
}

/// Stop the game and notify every session.
pub async fn stop_game(state: &SharedState, claimed: &str) -> Result<(), ServiceError> {
    let admin_id = state.admin().authorize(claimed).await?;
    state.stop_game().await;
    info!(admin = %admin_id, "game stopped");
    broadcast(state, &ServerMessage::GameStopped).await;
    Ok(())
}

/// Lock or unlock a single session.
///
/// The push is unconditional, not diffed: unlocking an already-unlocked
/// session still returns ok and still pushes `lock_status`.
pub async fn set_lock(
    state: &SharedState,
    claimed: &str,
    target_id: &str,
    locked: bool,
) -> Result<(), ServiceError> {
    state.admin().authorize(claimed).await?;

    let tx = state
        .sessions()
        .sender(target_id)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{target_id}`")))?;
    state.sessions().set_locked(target_id, locked);

    let message = ServerMessage::LockStatus {
        locked,
        reason: locked.then(|| "locked by admin".to_string()),
    };
    if push(&tx, &message).is_err() {
        state.remove_session(target_id).await;
        return Err(ServiceError::ChannelClosed(format!(
            "session `{target_id}` disconnected"
        )));
    }

    Ok(())
}

/// Lock or unlock every connected player session.
///
/// Best effort: sessions with a closed channel are skipped, removed, and not
/// retried. Returns the number of sessions actually reached.
pub async fn set_lock_all(
    state: &SharedState,
    claimed: &str,
    locked: bool,
) -> Result<usize, ServiceError> {
    state.admin().authorize(claimed).await?;

    let message = ServerMessage::LockStatus {
        locked,
        reason: locked.then(|| "locked by admin".to_string()),
    };
    let channels = state.sessions().channels(true);
    let mut affected = 0;
    let mut dead = Vec::new();

    for (id, tx) in channels {
        state.sessions().set_locked(&id, locked);
        match push(&tx, &message) {
            Ok(()) => affected += 1,
            Err(_) => dead.push(id),
        }
    }

    for id in dead {
        warn!(id = %id, "removing disconnected session during lock-all");
        state.remove_session(&id).await;
    }

    Ok(affected)
}

/// Clear one player's progress snapshot; the client clears its own persisted
/// state when the `reset` event arrives.
pub async fn reset_progress(
    state: &SharedState,
    claimed: &str,
    target_id: &str,
) -> Result<(), ServiceError> {
    state.admin().authorize(claimed).await?;

    if !state.sessions().clear_progress(target_id) {
        return Err(ServiceError::NotFound(format!("session `{target_id}`")));
    }
    let tx = state
        .sessions()
        .sender(target_id)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{target_id}`")))?;

    if push(&tx, &ServerMessage::Reset).is_err() {
        state.remove_session(target_id).await;
        return Err(ServiceError::ChannelClosed(format!(
            "session `{target_id}` disconnected"
        )));
    }

    Ok(())
}

/// List every live player session, excluding the admin channel.
pub fn list_players(state: &SharedState) -> Vec<PlayerSummary> {
    state.sessions().list(true)
}
