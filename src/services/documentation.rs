use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Locked Dungeon backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::players::list_players,
        crate::routes::admin::login,
        crate::routes::admin::bind,
        crate::routes::admin::takeover,
        crate::routes::admin::approve,
        crate::routes::admin::start_game,
        crate::routes::admin::stop_game,
        crate::routes::admin::lock,
        crate::routes::admin::lock_all,
        crate::routes::admin::reset,
        crate::routes::analytics::analytics_stats,
        crate::routes::analytics::sessions_dump,
        crate::routes::analytics::clear_analytics,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::player::PlayerSummary,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::admin::LoginRequest,
            crate::dto::admin::LoginResponse,
            crate::dto::admin::BindRequest,
            crate::dto::admin::TakeoverRequest,
            crate::dto::admin::TakeoverResponse,
            crate::dto::admin::ApproveRequest,
            crate::dto::admin::GameControlRequest,
            crate::dto::admin::LockRequest,
            crate::dto::admin::LockAllRequest,
            crate::dto::admin::LockAllResponse,
            crate::dto::admin::ResetRequest,
            crate::dto::admin::ActionResponse,
            crate::dto::admin::PasswordRequest,
            crate::dto::admin::SessionsDump,
            crate::analytics::AnalyticsEvent,
            crate::analytics::AnalyticsStats,
            crate::analytics::CompletionSample,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "Read-only player session listings"),
        (name = "admin", description = "Privileged admin commands"),
        (name = "analytics", description = "Password-gated analytics queries"),
        (name = "ws", description = "WebSocket operations for game clients"),
    )
)]
pub struct ApiDoc;
