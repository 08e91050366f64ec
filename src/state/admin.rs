//! Admin singleton coordinator and the 2FA approval bookkeeping.
//!
//! At most one admin identity is active at any instant. Logging in while an
//! admin is active never succeeds directly; it parks the candidate behind an
//! approval request that only the active admin can resolve.

use std::fmt;
use std::time::{Duration, Instant};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{RwLock, RwLockWriteGuard, mpsc};
use uuid::Uuid;

use crate::error::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Dedicated admin identity, distinct from any player session id.
///
/// Privileged endpoints compare the caller's claimed id against this type
/// rather than scattering string comparisons.
pub struct AdminId(String);

impl AdminId {
    fn mint() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// String form presented to and echoed back by the admin client.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a claimed id from the wire names this identity.
    pub fn matches(&self, claimed: &str) -> bool {
        self.0 == claimed
    }
}

impl fmt::Display for AdminId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
/// The currently-authenticated admin, if any.
pub struct ActiveAdmin {
    /// Admin identity checked on every privileged call.
    pub id: AdminId,
    /// Registry session bound as the admin connection, once known.
    pub session_id: Option<String>,
    /// Push channel for targeted admin delivery, once bound.
    pub channel: Option<mpsc::UnboundedSender<Message>>,
}

#[derive(Clone)]
/// One outstanding 2FA approval awaiting the active admin's decision.
pub struct PendingApproval {
    /// Identifier handed to the approve endpoint.
    pub request_id: Uuid,
    /// Candidate's connection session id, when the login came over a
    /// persistent channel.
    pub session_id: Option<String>,
    /// Candidate's display name, if known.
    pub player_name: Option<String>,
    /// Channel to notify of the outcome; absent for REST-only candidates.
    pub channel: Option<mpsc::UnboundedSender<Message>>,
    /// Used to expire requests the admin never answers.
    pub created_at: Instant,
}

/// Candidate details captured when a credentialed login arrives.
pub struct Candidate {
    /// Connection session id, when logging in over the persistent channel.
    pub session_id: Option<String>,
    /// Display name, if known.
    pub player_name: Option<String>,
    /// Channel to notify of deferred outcomes.
    pub channel: Option<mpsc::UnboundedSender<Message>>,
}

/// What a credentialed login attempt resolved to.
pub enum LoginDecision {
    /// No admin was active; the caller is installed immediately.
    Accepted(AdminId),
    /// An admin is active; the caller is parked behind this request.
    Pending(Uuid),
}

/// Shared admin coordination state.
pub struct AdminState {
    active: RwLock<Option<ActiveAdmin>>,
    pending: DashMap<Uuid, PendingApproval>,
    grants: DashMap<String, Instant>,
}

impl AdminState {
    /// Create the coordinator with no admin active.
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
            pending: DashMap::new(),
            grants: DashMap::new(),
        }
    }

    /// Snapshot the active admin, if any.
    pub async fn active(&self) -> Option<ActiveAdmin> {
        self.active.read().await.clone()
    }

    /// Write access to the singleton slot, for callers that must mutate it
    /// atomically with registry changes.
    pub(crate) async fn active_mut(&self) -> RwLockWriteGuard<'_, Option<ActiveAdmin>> {
        self.active.write().await
    }

    /// Push channel bound to the admin identity, if one is open.
    pub async fn channel(&self) -> Option<mpsc::UnboundedSender<Message>> {
        self.active
            .read()
            .await
            .as_ref()
            .and_then(|admin| admin.channel.clone())
    }

    /// Verify that a claimed session id names the active admin.
    pub async fn authorize(&self, claimed: &str) -> Result<AdminId, ServiceError> {
        match self.active.read().await.as_ref() {
            Some(admin) if admin.id.matches(claimed) => Ok(admin.id.clone()),
            Some(_) => Err(ServiceError::Unauthorized(
                "caller is not the active admin".into(),
            )),
            None => Err(ServiceError::Unauthorized("no active admin".into())),
        }
    }

    /// Decide a credentialed login: install the candidate when the slot is
    /// free, otherwise park it behind a fresh approval request.
    ///
    /// The caller has already checked the shared secret.
    pub async fn begin_login(&self, candidate: Candidate) -> LoginDecision {
        let mut active = self.active.write().await;
        if active.is_none() {
            let id = AdminId::mint();
            *active = Some(ActiveAdmin {
                id: id.clone(),
                session_id: candidate.session_id,
                channel: candidate.channel,
            });
            return LoginDecision::Accepted(id);
        }
        drop(active);

        let request_id = Uuid::new_v4();
        self.pending.insert(
            request_id,
            PendingApproval {
                request_id,
                session_id: candidate.session_id,
                player_name: candidate.player_name,
                channel: candidate.channel,
                created_at: Instant::now(),
            },
        );
        LoginDecision::Pending(request_id)
    }

    /// Install a new admin unconditionally, returning the displaced one.
    pub async fn install(
        &self,
        session_id: Option<String>,
        channel: Option<mpsc::UnboundedSender<Message>>,
    ) -> (AdminId, Option<ActiveAdmin>) {
        let id = AdminId::mint();
        let mut active = self.active.write().await;
        let previous = active.replace(ActiveAdmin {
            id: id.clone(),
            session_id,
            channel,
        });
        (id, previous)
    }

    /// Bind an open connection as the admin channel, returning the session id
    /// it displaces so the caller can clear that session's admin flag.
    ///
    /// Fails with `Unauthorized` unless `claimed` names the active admin.
    pub async fn bind_channel(
        &self,
        claimed: &str,
        session_id: &str,
        channel: mpsc::UnboundedSender<Message>,
    ) -> Result<(AdminId, Option<String>), ServiceError> {
        let mut active = self.active.write().await;
        match active.as_mut() {
            Some(admin) if admin.id.matches(claimed) => {
                let displaced = admin
                    .session_id
                    .replace(session_id.to_string())
                    .filter(|old| old != session_id);
                admin.channel = Some(channel);
                Ok((admin.id.clone(), displaced))
            }
            Some(_) => Err(ServiceError::Unauthorized(
                "claimed id is not the active admin".into(),
            )),
            None => Err(ServiceError::Unauthorized("no active admin".into())),
        }
    }

    /// Remove and return a pending approval, failing when the id is unknown
    /// or already resolved. Double resolution therefore never double-delivers.
    pub fn resolve(&self, request_id: Uuid) -> Result<PendingApproval, ServiceError> {
        self.pending
            .remove(&request_id)
            .map(|(_, pending)| pending)
            .ok_or_else(|| ServiceError::RequestNotFound(request_id.to_string()))
    }

    /// Record that an approved candidate may complete the login handshake.
    pub fn grant(&self, session_id: &str) {
        self.grants.insert(session_id.to_string(), Instant::now());
    }

    /// Consume a grant, returning whether one existed.
    pub fn take_grant(&self, session_id: &str) -> bool {
        self.grants.remove(session_id).is_some()
    }

    /// Drop any grant left behind by a departed session.
    pub fn drop_grant(&self, session_id: &str) {
        self.grants.remove(session_id);
    }

    /// Drain approval requests older than `max_age`.
    pub fn expired_pending(&self, max_age: Duration) -> Vec<PendingApproval> {
        let stale = self
            .pending
            .iter()
            .filter(|entry| entry.created_at.elapsed() >= max_age)
            .map(|entry| entry.request_id)
            .collect::<Vec<_>>();

        stale
            .into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|(_, pending)| pending))
            .collect()
    }

    /// Number of unresolved approval requests.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for AdminState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(session: &str) -> Candidate {
        Candidate {
            session_id: Some(session.to_string()),
            player_name: None,
            channel: None,
        }
    }

    #[tokio::test]
    async fn first_login_is_accepted_second_goes_pending() {
        let admin = AdminState::new();

        let first = admin.begin_login(candidate("a")).await;
        let LoginDecision::Accepted(id) = first else {
            panic!("expected immediate acceptance");
        };
        assert!(admin.authorize(id.as_str()).await.is_ok());

        let second = admin.begin_login(candidate("b")).await;
        assert!(matches!(second, LoginDecision::Pending(_)));
        assert_eq!(admin.pending_len(), 1);
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let admin = AdminState::new();
        admin.begin_login(candidate("a")).await;
        let LoginDecision::Pending(request_id) = admin.begin_login(candidate("b")).await else {
            panic!("expected pending decision");
        };

        assert!(admin.resolve(request_id).is_ok());
        assert!(matches!(
            admin.resolve(request_id),
            Err(ServiceError::RequestNotFound(_))
        ));
    }

    #[tokio::test]
    async fn authorize_rejects_foreign_and_missing_ids() {
        let admin = AdminState::new();
        assert!(matches!(
            admin.authorize("nobody").await,
            Err(ServiceError::Unauthorized(_))
        ));

        let LoginDecision::Accepted(id) = admin.begin_login(candidate("a")).await else {
            panic!("expected acceptance");
        };
        assert!(matches!(
            admin.authorize("someone-else").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(admin.authorize(id.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn install_reports_the_displaced_admin() {
        let admin = AdminState::new();
        let LoginDecision::Accepted(old) = admin.begin_login(candidate("a")).await else {
            panic!("expected acceptance");
        };

        let (new_id, previous) = admin.install(None, None).await;
        assert_ne!(new_id, old);
        assert_eq!(previous.unwrap().id, old);
        assert!(admin.authorize(old.as_str()).await.is_err());
        assert!(admin.authorize(new_id.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn expired_pending_drains_old_requests_once() {
        let admin = AdminState::new();
        admin.begin_login(candidate("a")).await;
        admin.begin_login(candidate("b")).await;
        admin.begin_login(candidate("c")).await;
        assert_eq!(admin.pending_len(), 2);

        let expired = admin.expired_pending(Duration::ZERO);
        assert_eq!(expired.len(), 2);
        assert!(admin.expired_pending(Duration::ZERO).is_empty());
    }

    #[tokio::test]
    async fn bind_channel_reports_the_displaced_session() {
        let admin = AdminState::new();
        let LoginDecision::Accepted(id) = admin.begin_login(candidate("a")).await else {
            panic!("expected acceptance");
        };

        let (tx, _rx) = mpsc::unbounded_channel();
        let (bound_id, displaced) = admin
            .bind_channel(id.as_str(), "b", tx.clone())
            .await
            .unwrap();
        assert_eq!(bound_id, id);
        assert_eq!(displaced.as_deref(), Some("a"));

        // Rebinding the same session displaces nothing.
        let (_, displaced) = admin.bind_channel(id.as_str(), "b", tx).await.unwrap();
        assert!(displaced.is_none());
    }

    #[tokio::test]
    async fn grants_are_single_use() {
        let admin = AdminState::new();
        admin.grant("b");
        assert!(admin.take_grant("b"));
        assert!(!admin.take_grant("b"));
    }
}
