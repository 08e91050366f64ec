use crate::{dto::health::HealthResponse, state::SharedState};

/// Describe the current process: live session count and the game flag.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.sessions().len(), state.game_started().await)
}
