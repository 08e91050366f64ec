//! Service layer sitting between the HTTP/WebSocket routes and the shared
//! state.

pub mod admin_service;
pub mod analytics_service;
pub mod documentation;
pub mod health_service;
pub mod session_service;
pub mod sweeper;
