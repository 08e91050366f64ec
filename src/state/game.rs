//! Process-wide started/stopped game flag.

use time::OffsetDateTime;

use super::admin::AdminId;

#[derive(Clone, Debug, Default)]
/// Whether the game is running, and who last started it.
///
/// Mutated only through the admin start/stop commands; read by every session
/// on connect and on every transition.
pub struct GameState {
    /// Running flag broadcast to all sessions on change.
    pub started: bool,
    /// Admin identity that started the current run, if any.
    pub started_by: Option<String>,
    /// When the current run started.
    pub started_at: Option<OffsetDateTime>,
}

impl GameState {
    /// Fresh stopped state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the game as started by the given admin.
    pub fn start(&mut self, admin: &AdminId) {
        self.started = true;
        self.started_by = Some(admin.to_string());
        self.started_at = Some(OffsetDateTime::now_utc());
    }

    /// Mark the game as stopped.
    pub fn stop(&mut self) {
        self.started = false;
        self.started_by = None;
        self.started_at = None;
    }
}
