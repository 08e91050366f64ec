use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::player::PlayerSummary, services::admin_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/api/players",
    tag = "players",
    responses((status = 200, description = "Live player sessions, admin excluded", body = [PlayerSummary]))
)]
/// List every live player session. Order is undefined.
pub async fn list_players(State(state): State<SharedState>) -> Json<Vec<PlayerSummary>> {
    Json(admin_service::list_players(&state))
}

/// Configure the player listing route.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/api/players", get(list_players))
}
