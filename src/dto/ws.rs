use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::validation::validate_player_name;

/// Failure modes when decoding an inbound client frame.
#[derive(Debug, Error)]
pub enum ClientMessageError {
    /// The frame was not valid JSON or did not match any known message shape.
    #[error("malformed message: {0}")]
    Parse(#[from] serde_json::Error),
    /// The frame parsed but carried an invalid field value.
    #[error("invalid message: {0}")]
    Validation(#[from] validator::ValidationError),
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
/// Messages accepted from players and admin candidates over the WebSocket.
pub enum ClientMessage {
    /// Application-level liveness check; answered with [`ServerMessage::Pong`].
    Ping,
    /// Set the display name for this session.
    SetName {
        /// Free-form display name shown on the admin dashboard.
        player_name: String,
    },
    /// Replace the session's progress snapshot wholesale.
    ProgressUpdate {
        /// Free-form progress blob (difficulty, solved set, lives, ...).
        #[schema(value_type = Object)]
        progress: Value,
    },
    /// Append an analytics event for this session.
    Event {
        /// Event name, e.g. `attempt`, `completion`, `hint`, `locked`.
        event: String,
        /// Arbitrary event payload.
        #[serde(default)]
        #[schema(value_type = Object)]
        details: Value,
    },
    /// Attempt an admin login over the persistent channel.
    AdminLoginRequest {
        /// Shared admin secret.
        password: String,
    },
    /// Complete the admin handshake, binding this connection as the admin
    /// channel. Carries the HTTP-issued admin id when the login happened over
    /// the REST surface.
    AdminAuthenticated {
        /// Admin session id minted by the REST login, if any.
        #[serde(default)]
        session_id: Option<String>,
    },
    /// Anything we do not recognize; logged and dropped.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse and validate a raw JSON frame from a client.
    pub fn from_json_str(raw: &str) -> Result<Self, ClientMessageError> {
        let message: Self = serde_json::from_str(raw)?;
        if let Self::SetName { player_name } = &message {
            validate_player_name(player_name)?;
        }
        Ok(message)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
/// Push events sent to clients over the persistent channel.
pub enum ServerMessage {
    /// First message after connect: the session id and the current game flag.
    SessionId {
        /// Identifier minted for this connection.
        session_id: String,
        /// Whether the game is currently running.
        game_started: bool,
    },
    /// The admin started the game.
    GameStarted,
    /// The admin stopped the game.
    GameStopped,
    /// Lock flag changed for the receiving session.
    LockStatus {
        /// New lock flag; enforcement happens client-side.
        locked: bool,
        /// Optional human-readable cause.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// The admin reset this session; the client clears its persisted state.
    Reset,
    /// Outcome of an admin login attempt or of the 2FA approval flow.
    AdminLoginResponse {
        /// Whether admin access is (now) granted.
        success: bool,
        /// Failure or deferral reason, e.g. `pending_approval`, `admin_denied`.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// The admin session id to present on the REST surface, on success.
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// Sent to the active admin when a second credentialed login arrives.
    #[serde(rename = "2fa_request")]
    TwoFactorRequest {
        /// Identifier to pass back to the approve endpoint.
        request_id: Uuid,
        /// Candidate's connection session id, when the login came over a
        /// persistent channel.
        session_id: Option<String>,
        /// Candidate's display name, if known.
        player_name: Option<String>,
    },
    /// Sent to an admin being displaced by a forced takeover.
    ForceLogout {
        /// Explanation shown to the displaced admin.
        message: String,
    },
    /// Liveness reply to a client-initiated ping.
    Pong,
    /// Admin-only: live forward of a player's progress snapshot.
    ProgressUpdate {
        /// Session the snapshot belongs to.
        session_id: String,
        /// Player display name, if known.
        player_name: Option<String>,
        /// The snapshot as reported by the client.
        #[schema(value_type = Object)]
        progress: Value,
    },
    /// Admin-only: a player connection opened.
    PlayerConnected {
        /// The new session's id.
        session_id: String,
    },
    /// Admin-only: a player connection closed.
    PlayerDisconnected {
        /// The departed session's id.
        session_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_name_with_camel_case_field() {
        let msg =
            ClientMessage::from_json_str(r#"{"type":"set_name","playerName":"Riddler"}"#).unwrap();
        match msg {
            ClientMessage::SetName { player_name } => assert_eq!(player_name, "Riddler"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_player_name() {
        let result = ClientMessage::from_json_str(r#"{"type":"set_name","playerName":"  "}"#);
        assert!(matches!(result, Err(ClientMessageError::Validation(_))));
    }

    #[test]
    fn unknown_type_maps_to_unknown_variant() {
        let msg = ClientMessage::from_json_str(r#"{"type":"mystery"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn two_factor_request_uses_legacy_tag() {
        let msg = ServerMessage::TwoFactorRequest {
            request_id: Uuid::nil(),
            session_id: Some("abc".into()),
            player_name: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "2fa_request");
        assert_eq!(value["sessionId"], "abc");
        assert!(value.get("requestId").is_some());
    }

    #[test]
    fn session_id_event_serializes_camel_case() {
        let msg = ServerMessage::SessionId {
            session_id: "abc123".into(),
            game_started: false,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "session_id");
        assert_eq!(value["sessionId"], "abc123");
        assert_eq!(value["gameStarted"], false);
    }

    #[test]
    fn lock_status_omits_absent_reason() {
        let msg = ServerMessage::LockStatus {
            locked: false,
            reason: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("reason").is_none());
    }
}
