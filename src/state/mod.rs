//! Central application state storing the session registry, the admin
//! singleton, the game flag, and the analytics sink.

pub mod admin;
pub mod game;
pub mod registry;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{analytics::AnalyticsSink, config::AppConfig};

pub use self::admin::{ActiveAdmin, AdminId, AdminState, Candidate, LoginDecision, PendingApproval};
pub use self::game::GameState;
pub use self::registry::{Session, SessionRegistry};

/// Shared handle to [`AppState`], cloned into every handler and task.
pub type SharedState = Arc<AppState>;

/// Central application state.
///
/// All mutations happen inside handler bodies that run to completion without
/// suspending mid-mutation; registry entries are never held across `await`s.
pub struct AppState {
    config: AppConfig,
    sessions: SessionRegistry,
    admin: AdminState,
    game: RwLock<GameState>,
    analytics: AnalyticsSink,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned
    /// cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            config,
            sessions: SessionRegistry::new(),
            admin: AdminState::new(),
            game: RwLock::new(GameState::new()),
            analytics: AnalyticsSink::new(),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of live sessions keyed by their identifier.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Admin singleton coordinator and 2FA bookkeeping.
    pub fn admin(&self) -> &AdminState {
        &self.admin
    }

    /// Append-only analytics sink.
    pub fn analytics(&self) -> &AnalyticsSink {
        &self.analytics
    }

    /// Current value of the started flag.
    pub async fn game_started(&self) -> bool {
        self.game.read().await.started
    }

    /// Snapshot the game flag.
    pub async fn game_snapshot(&self) -> GameState {
        self.game.read().await.clone()
    }

    /// Flip the game flag to started, attributed to `admin`.
    pub async fn start_game(&self, admin: &AdminId) {
        self.game.write().await.start(admin);
    }

    /// Flip the game flag to stopped.
    pub async fn stop_game(&self) {
        self.game.write().await.stop();
    }

    /// Remove a session, clearing the admin singleton in the same critical
    /// section when the removed session was the bound admin connection.
    ///
    /// Every teardown path (socket close, liveness termination, idle
    /// eviction, takeover) funnels through here so no window exists where the
    /// singleton points at a deleted session.
    pub async fn remove_session(&self, id: &str) -> Option<Session> {
        let removed = {
            let mut active = self.admin.active_mut().await;
            let removed = self.sessions.remove(id);
            let was_admin_channel = active
                .as_ref()
                .and_then(|admin| admin.session_id.as_deref())
                == Some(id);
            if was_admin_channel {
                *active = None;
            }
            removed
        };
        self.admin.drop_grant(id);
        removed
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn removing_the_admin_session_clears_the_singleton() {
        let state = AppState::new(AppConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = state.sessions().create(tx.clone());

        let decision = state
            .admin()
            .begin_login(Candidate {
                session_id: Some(session.id.clone()),
                player_name: None,
                channel: Some(tx),
            })
            .await;
        assert!(matches!(decision, LoginDecision::Accepted(_)));

        state.remove_session(&session.id).await;
        assert!(state.admin().active().await.is_none());
        assert!(state.sessions().get(&session.id).is_none());
    }

    #[tokio::test]
    async fn removing_a_player_session_keeps_the_admin() {
        let state = AppState::new(AppConfig::default());
        let (admin_tx, _admin_rx) = mpsc::unbounded_channel();
        let admin_session = state.sessions().create(admin_tx.clone());
        state
            .admin()
            .begin_login(Candidate {
                session_id: Some(admin_session.id.clone()),
                player_name: None,
                channel: Some(admin_tx),
            })
            .await;

        let (player_tx, _player_rx) = mpsc::unbounded_channel();
        let player = state.sessions().create(player_tx);
        state.remove_session(&player.id).await;

        assert!(state.admin().active().await.is_some());
        assert!(state.sessions().get(&admin_session.id).is_some());
    }
}
