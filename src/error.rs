use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in service layer operations.
///
/// Every variant is a terminal, synchronous outcome of a single request;
/// the core never retries on behalf of the caller.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The shared admin secret did not match.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Caller is not the recognized active admin for a privileged operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Target session id is unknown. A normal consequence of races with
    /// disconnects, not a bug.
    #[error("not found: {0}")]
    NotFound(String),
    /// Target session exists but its transport is no longer open. Delivery is
    /// at-most-once; the command is not queued for later.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
    /// Stale or already-resolved 2FA request id.
    #[error("approval request not found: {0}")]
    RequestNotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Wrong shared secret or missing admin identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Caller is authenticated but not the active admin.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current connection state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials => AppError::Unauthorized("invalid password".into()),
            ServiceError::Unauthorized(message) => AppError::Forbidden(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::ChannelClosed(message) => AppError::Conflict(message),
            ServiceError::RequestNotFound(message) => AppError::NotFound(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
