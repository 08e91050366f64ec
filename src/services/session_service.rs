//! WebSocket connection lifecycle: session creation, the inbound message
//! loop, and teardown.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::admin_service,
    state::SharedState,
};

/// Serialize a payload and push it onto a session's writer channel.
///
/// Delivery is fire-and-forget: a closed writer is reported as
/// [`ServiceError::ChannelClosed`] for the caller to act on, never a panic.
/// Serialization failure is a permanent error (a bug in our own types), so it
/// is logged and swallowed rather than retried.
pub fn push(
    tx: &mpsc::UnboundedSender<Message>,
    message: &ServerMessage,
) -> Result<(), ServiceError> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize push event `{message:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ServiceError::ChannelClosed("writer channel closed".into()))
}

/// Forward an event to the bound admin channel, if one exists.
///
/// Admin-facing forwards are best-effort; a closed admin channel is logged
/// and the event dropped.
pub async fn notify_admin(state: &SharedState, message: &ServerMessage) {
    let Some(tx) = state.admin().channel().await else {
        return;
    };
    if push(&tx, message).is_err() {
        debug!("admin channel closed while forwarding event");
    }
}

/// Handle the full lifecycle for one WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let session = state.sessions().create(outbound_tx.clone());
    let session_id = session.id;

    // The session id must be the first event the client sees; everything the
    // client does next depends on it.
    let hello = ServerMessage::SessionId {
        session_id: session_id.clone(),
        game_started: state.game_started().await,
    };
    if push(&outbound_tx, &hello).is_err() {
        state.remove_session(&session_id).await;
        finalize(writer_task, outbound_tx).await;
        return;
    }

    info!(id = %session_id, "player connected");
    notify_admin(
        &state,
        &ServerMessage::PlayerConnected {
            session_id: session_id.clone(),
        },
    )
    .await;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                state.sessions().touch(&session_id);
                match ClientMessage::from_json_str(&text) {
                    Ok(msg) => {
                        handle_client_message(&state, &session_id, &outbound_tx, msg).await;
                    }
                    Err(err) => {
                        warn!(id = %session_id, error = %err, "dropping malformed client message");
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                state.sessions().touch(&session_id);
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Pong(_)) => {
                // Probe reply; clears the pending flag via touch.
                state.sessions().touch(&session_id);
            }
            Ok(Message::Close(frame)) => {
                info!(id = %session_id, "client closed connection");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Err(err) => {
                warn!(id = %session_id, error = %err, "websocket error");
                break;
            }
        }
    }

    let removed = state.remove_session(&session_id).await;
    if removed.as_ref().is_some_and(|session| session.is_admin) {
        info!(id = %session_id, "admin channel closed; admin slot released");
    } else {
        notify_admin(
            &state,
            &ServerMessage::PlayerDisconnected {
                session_id: session_id.clone(),
            },
        )
        .await;
    }
    info!(id = %session_id, "player disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Dispatch one parsed inbound message. The session has already been touched.
pub async fn handle_client_message(
    state: &SharedState,
    session_id: &str,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Ping => {
            let _ = push(outbound_tx, &ServerMessage::Pong);
        }
        ClientMessage::SetName { player_name } => {
            if !state.sessions().set_name(session_id, &player_name) {
                return;
            }
            let progress = state
                .sessions()
                .get(session_id)
                .map(|session| session.progress)
                .unwrap_or(Value::Null);
            notify_admin(
                state,
                &ServerMessage::ProgressUpdate {
                    session_id: session_id.to_string(),
                    player_name: Some(player_name),
                    progress,
                },
            )
            .await;
        }
        ClientMessage::ProgressUpdate { progress } => {
            if !state.sessions().set_progress(session_id, progress.clone()) {
                return;
            }
            let player_name = state
                .sessions()
                .get(session_id)
                .and_then(|session| session.player_name);
            notify_admin(
                state,
                &ServerMessage::ProgressUpdate {
                    session_id: session_id.to_string(),
                    player_name,
                    progress,
                },
            )
            .await;
        }
        ClientMessage::Event { event, details } => {
            let player_name = state
                .sessions()
                .get(session_id)
                .and_then(|session| session.player_name);
            state
                .analytics()
                .record(event, session_id, player_name, details)
                .await;
        }
        ClientMessage::AdminLoginRequest { password } => {
            admin_service::websocket_login(state, session_id, outbound_tx, &password).await;
        }
        ClientMessage::AdminAuthenticated { session_id: claimed } => {
            admin_service::complete_handshake(state, session_id, outbound_tx, claimed).await;
        }
        ClientMessage::Unknown => {
            warn!(id = %session_id, "ignoring unrecognized message type");
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
