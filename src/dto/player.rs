use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Snapshot of one live session as shown on the admin dashboard.
///
/// Listings are produced in the registry's iteration order, which is
/// undefined; callers needing a stable order must sort explicitly.
pub struct PlayerSummary {
    /// Session identifier.
    pub session_id: String,
    /// Display name, if the client reported one.
    pub player_name: Option<String>,
    /// Admin-controlled lock flag.
    pub locked: bool,
    /// Last progress snapshot reported by the client.
    #[schema(value_type = Object)]
    pub progress: Value,
    /// Connection creation time, unix milliseconds.
    pub connected_at: i64,
    /// Seconds since the last inbound message from this session.
    pub idle_seconds: u64,
}
