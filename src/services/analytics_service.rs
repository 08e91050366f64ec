//! Password-gated read-only views over the analytics sink.

use crate::{
    analytics::AnalyticsStats,
    dto::admin::SessionsDump,
    error::ServiceError,
    state::SharedState,
};

fn check_password(state: &SharedState, password: &str) -> Result<(), ServiceError> {
    if state.config().verify_password(password) {
        Ok(())
    } else {
        Err(ServiceError::InvalidCredentials)
    }
}

/// Aggregate the analytics log into dashboard statistics.
pub async fn stats(state: &SharedState, password: &str) -> Result<AnalyticsStats, ServiceError> {
    check_password(state, password)?;
    Ok(state.analytics().stats().await)
}

/// Raw dump of live sessions (admin included) plus the full event log.
pub async fn dump(state: &SharedState, password: &str) -> Result<SessionsDump, ServiceError> {
    check_password(state, password)?;
    Ok(SessionsDump {
        sessions: state.sessions().list(false),
        events: state.analytics().dump().await,
    })
}

/// Discard every recorded analytics event.
pub async fn clear(state: &SharedState, password: &str) -> Result<(), ServiceError> {
    check_password(state, password)?;
    state.analytics().clear().await;
    Ok(())
}
