use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{analytics::AnalyticsEvent, dto::player::PlayerSummary};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Body of an admin login attempt on the REST surface.
pub struct LoginRequest {
    /// Shared admin secret.
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
/// Terminal or deferred outcome of a login attempt.
pub enum LoginStatus {
    /// Caller is now the active admin.
    Accepted,
    /// Another admin is active; the request awaits 2FA approval.
    Pending,
    /// The shared secret did not match.
    Rejected,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Reply to a REST login attempt.
pub struct LoginResponse {
    /// Outcome of the attempt.
    pub status: LoginStatus,
    /// Admin session id to present on subsequent privileged calls, when
    /// accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Identifier of the pending approval, when deferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Associate an open WebSocket connection with the HTTP-issued admin id.
pub struct BindRequest {
    /// Admin session id returned by the login endpoint.
    pub session_id: String,
    /// Session id of the WebSocket connection to bind as the admin channel.
    pub connection_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Body of a forced admin takeover.
pub struct TakeoverRequest {
    /// Shared admin secret.
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Reply to a successful forced takeover.
pub struct TakeoverResponse {
    /// The freshly minted admin session id.
    pub session_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Resolve one outstanding 2FA approval request.
pub struct ApproveRequest {
    /// Caller's admin session id.
    pub session_id: String,
    /// Identifier of the pending request.
    pub request_id: Uuid,
    /// Whether the candidate is allowed in.
    pub approved: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Body of a privileged command that carries only the caller's identity.
pub struct GameControlRequest {
    /// Caller's admin session id.
    pub session_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Lock or unlock a single player session.
pub struct LockRequest {
    /// Caller's admin session id.
    pub session_id: String,
    /// Target player session.
    pub target_id: String,
    /// Desired lock flag.
    pub locked: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Lock or unlock every connected player session.
pub struct LockAllRequest {
    /// Caller's admin session id.
    pub session_id: String,
    /// Desired lock flag.
    pub locked: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Best-effort outcome of a broadcast-style command.
pub struct LockAllResponse {
    /// Number of sessions the command actually reached.
    pub affected: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Clear one player's progress snapshot.
pub struct ResetRequest {
    /// Caller's admin session id.
    pub session_id: String,
    /// Target player session.
    pub target_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Uniform acknowledgement for commands without a richer payload.
pub struct ActionResponse {
    /// Always true; errors surface as HTTP error responses instead.
    pub ok: bool,
}

impl ActionResponse {
    /// Positive acknowledgement.
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Body of the password-gated read-only endpoints.
pub struct PasswordRequest {
    /// Shared admin secret.
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Raw dump of live sessions plus the full analytics log.
pub struct SessionsDump {
    /// Every live session, admin included.
    pub sessions: Vec<PlayerSummary>,
    /// The append-only analytics log, oldest first.
    pub events: Vec<AnalyticsEvent>,
}
