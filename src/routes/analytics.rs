use axum::{Json, Router, extract::State, routing::post};

use crate::{
    analytics::AnalyticsStats,
    dto::admin::{ActionResponse, PasswordRequest, SessionsDump},
    error::AppError,
    services::analytics_service,
    state::SharedState,
};

/// Password-gated analytics endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/admin/analytics", post(analytics_stats))
        .route("/api/admin/sessions", post(sessions_dump))
        .route("/api/admin/clear", post(clear_analytics))
}

#[utoipa::path(
    post,
    path = "/api/admin/analytics",
    tag = "analytics",
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Aggregated statistics", body = AnalyticsStats),
        (status = 401, description = "Wrong password")
    )
)]
/// Aggregate the analytics log into dashboard statistics.
pub async fn analytics_stats(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordRequest>,
) -> Result<Json<AnalyticsStats>, AppError> {
    Ok(Json(
        analytics_service::stats(&state, &payload.password).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/sessions",
    tag = "analytics",
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Raw sessions and event log", body = SessionsDump),
        (status = 401, description = "Wrong password")
    )
)]
/// Raw dump of live sessions plus the full event log.
pub async fn sessions_dump(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordRequest>,
) -> Result<Json<SessionsDump>, AppError> {
    Ok(Json(
        analytics_service::dump(&state, &payload.password).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/clear",
    tag = "analytics",
    request_body = PasswordRequest,
    responses(
        (status = 200, description = "Analytics log cleared", body = ActionResponse),
        (status = 401, description = "Wrong password")
    )
)]
/// Discard every recorded analytics event.
pub async fn clear_analytics(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    analytics_service::clear(&state, &payload.password).await?;
    Ok(Json(ActionResponse::ok()))
}
