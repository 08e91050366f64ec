use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status; always "ok" while the process is serving.
    pub status: String,
    /// Number of live sessions in the registry.
    pub sessions: usize,
    /// Whether the game is currently running.
    pub game_started: bool,
}

impl HealthResponse {
    /// Create a health response describing the current process.
    pub fn ok(sessions: usize, game_started: bool) -> Self {
        Self {
            status: "ok".to_string(),
            sessions,
            game_started,
        }
    }
}
