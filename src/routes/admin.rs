use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::admin::{
        ActionResponse, ApproveRequest, BindRequest, GameControlRequest, LockAllRequest,
        LockAllResponse, LockRequest, LoginRequest, LoginResponse, ResetRequest, TakeoverRequest,
        TakeoverResponse,
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Admin command endpoints. Every mutating call is guarded by the caller's
/// claimed session id matching the active admin, or by the shared secret.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/bind", post(bind))
        .route("/api/admin/takeover", post(takeover))
        .route("/api/admin/approve", post(approve))
        .route("/api/admin/game/start", post(start_game))
        .route("/api/admin/game/stop", post(stop_game))
        .route("/api/admin/lock", post(lock))
        .route("/api/admin/lock-all", post(lock_all))
        .route("/api/admin/reset", post(reset))
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "admin",
    request_body = LoginRequest,
    responses((status = 200, description = "Login outcome", body = LoginResponse))
)]
/// Attempt an admin login with the shared secret.
///
/// Returns `pending` instead of a terminal outcome when another admin is
/// already active; the 2FA flow decides the rest.
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Json<LoginResponse> {
    Json(admin_service::rest_login(&state, &payload.password).await)
}

#[utoipa::path(
    post,
    path = "/api/admin/bind",
    tag = "admin",
    request_body = BindRequest,
    responses(
        (status = 200, description = "Connection bound as the admin channel", body = ActionResponse),
        (status = 403, description = "Claimed id is not the active admin"),
        (status = 404, description = "Connection unknown")
    )
)]
/// Bind an open WebSocket connection as the admin push channel.
pub async fn bind(
    State(state): State<SharedState>,
    Json(payload): Json<BindRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    admin_service::bind_channel(&state, &payload.session_id, &payload.connection_id).await?;
    Ok(Json(ActionResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/admin/takeover",
    tag = "admin",
    request_body = TakeoverRequest,
    responses(
        (status = 200, description = "Caller installed as admin", body = TakeoverResponse),
        (status = 401, description = "Wrong password")
    )
)]
/// Forcibly displace the current admin and install the caller.
pub async fn takeover(
    State(state): State<SharedState>,
    Json(payload): Json<TakeoverRequest>,
) -> Result<Json<TakeoverResponse>, AppError> {
    Ok(Json(
        admin_service::force_takeover(&state, &payload.password).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/approve",
    tag = "admin",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Request resolved", body = ActionResponse),
        (status = 403, description = "Caller is not the active admin"),
        (status = 404, description = "Request unknown or already resolved")
    )
)]
/// Approve or deny one pending secondary admin login.
pub async fn approve(
    State(state): State<SharedState>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    admin_service::approve(
        &state,
        &payload.session_id,
        payload.request_id,
        payload.approved,
    )
    .await?;
    Ok(Json(ActionResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/admin/game/start",
    tag = "admin",
    request_body = GameControlRequest,
    responses(
        (status = 200, description = "Game started and broadcast", body = ActionResponse),
        (status = 403, description = "Caller is not the active admin")
    )
)]
/// Start the game for every connected session.
pub async fn start_game(
    State(state): State<SharedState>,
    Json(payload): Json<GameControlRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    admin_service::start_game(&state, &payload.session_id).await?;
    Ok(Json(ActionResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/admin/game/stop",
    tag = "admin",
    request_body = GameControlRequest,
    responses(
        (status = 200, description = "Game stopped and broadcast", body = ActionResponse),
        (status = 403, description = "Caller is not the active admin")
    )
)]
/// Stop the game for every connected session.
pub async fn stop_game(
    State(state): State<SharedState>,
    Json(payload): Json<GameControlRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    admin_service::stop_game(&state, &payload.session_id).await?;
    Ok(Json(ActionResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/admin/lock",
    tag = "admin",
    request_body = LockRequest,
    responses(
        (status = 200, description = "Lock flag pushed to the target", body = ActionResponse),
        (status = 404, description = "Target session unknown"),
        (status = 409, description = "Target disconnected before delivery")
    )
)]
/// Lock or unlock a single player session.
pub async fn lock(
    State(state): State<SharedState>,
    Json(payload): Json<LockRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    admin_service::set_lock(
        &state,
        &payload.session_id,
        &payload.target_id,
        payload.locked,
    )
    .await?;
    Ok(Json(ActionResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/api/admin/lock-all",
    tag = "admin",
    request_body = LockAllRequest,
    responses(
        (status = 200, description = "Best-effort broadcast outcome", body = LockAllResponse),
        (status = 403, description = "Caller is not the active admin")
    )
)]
/// Lock or unlock every connected player session, best effort.
pub async fn lock_all(
    State(state): State<SharedState>,
    Json(payload): Json<LockAllRequest>,
) -> Result<Json<LockAllResponse>, AppError> {
    let affected =
        admin_service::set_lock_all(&state, &payload.session_id, payload.locked).await?;
    Ok(Json(LockAllResponse { affected }))
}

#[utoipa::path(
    post,
    path = "/api/admin/reset",
    tag = "admin",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Progress cleared and reset pushed", body = ActionResponse),
        (status = 404, description = "Target session unknown"),
        (status = 409, description = "Target disconnected before delivery")
    )
)]
/// Clear one player's progress snapshot.
pub async fn reset(
    State(state): State<SharedState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    admin_service::reset_progress(&state, &payload.session_id, &payload.target_id).await?;
    Ok(Json(ActionResponse::ok()))
}
