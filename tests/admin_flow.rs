//! End-to-end flows over the service layer, with unbounded channels standing
//! in for the WebSocket writer tasks.

use std::time::Duration;

use axum::extract::ws::Message;
use locked_dungeon_back::{
    config::AppConfig,
    dto::ws::ClientMessage,
    error::ServiceError,
    services::{admin_service, session_service, sweeper},
    state::{AppState, SharedState},
};
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const PASSWORD: &str = "s3cret";

fn test_state() -> SharedState {
    AppState::new(AppConfig {
        admin_password: PASSWORD.into(),
        ..AppConfig::default()
    })
}

fn connect(
    state: &SharedState,
) -> (String, UnboundedSender<Message>, UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = state.sessions().create(tx.clone());
    (session.id, tx, rx)
}

fn next_json(rx: &mut UnboundedReceiver<Message>) -> Value {
    match rx.try_recv().expect("expected a pushed message") {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("push is valid JSON"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

fn drain(rx: &mut UnboundedReceiver<Message>) {
    while rx.try_recv().is_ok() {}
}

async fn login_admin(
    state: &SharedState,
    session_id: &str,
    tx: &UnboundedSender<Message>,
    rx: &mut UnboundedReceiver<Message>,
) -> String {
    admin_service::websocket_login(state, session_id, tx, PASSWORD).await;
    let response = next_json(rx);
    assert_eq!(response["type"], "admin_login_response");
    assert_eq!(response["success"], true);
    response["sessionId"].as_str().expect("admin id").to_string()
}

#[tokio::test]
async fn relogin_succeeds_after_admin_disconnect() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    state.remove_session(&a_id).await;
    assert!(state.admin().active().await.is_none());

    // No stale singleton blocks the next login: it succeeds first try.
    let (b_id, b_tx, mut b_rx) = connect(&state);
    login_admin(&state, &b_id, &b_tx, &mut b_rx).await;

    let admins = state
        .sessions()
        .list(false)
        .into_iter()
        .filter(|summary| summary.session_id == b_id)
        .count();
    assert_eq!(admins, 1);
}

#[tokio::test]
async fn second_login_is_parked_and_routed_to_the_admin() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (b_id, b_tx, mut b_rx) = connect(&state);
    drain(&mut b_rx);
    admin_service::websocket_login(&state, &b_id, &b_tx, PASSWORD).await;

    let candidate_view = next_json(&mut b_rx);
    assert_eq!(candidate_view["type"], "admin_login_response");
    assert_eq!(candidate_view["success"], false);
    assert_eq!(candidate_view["reason"], "pending_approval");

    let admin_view = next_json(&mut a_rx);
    assert_eq!(admin_view["type"], "2fa_request");
    assert_eq!(admin_view["sessionId"], b_id.as_str());
    assert!(admin_view["requestId"].as_str().is_some());
}

#[tokio::test]
async fn approved_candidate_completes_the_handshake() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (b_id, b_tx, mut b_rx) = connect(&state);
    admin_service::websocket_login(&state, &b_id, &b_tx, PASSWORD).await;
    drain(&mut b_rx);

    let request = next_json(&mut a_rx);
    let request_id = request["requestId"].as_str().unwrap().parse().unwrap();

    admin_service::approve(&state, &admin_id, request_id, true)
        .await
        .unwrap();

    // The approval only lifts the block; no sessionId yet.
    let lifted = next_json(&mut b_rx);
    assert_eq!(lifted["success"], true);
    assert!(lifted.get("sessionId").is_none());

    admin_service::complete_handshake(&state, &b_id, &b_tx, None).await;
    let installed = next_json(&mut b_rx);
    assert_eq!(installed["success"], true);
    assert!(installed["sessionId"].as_str().is_some());

    assert!(state.sessions().get(&b_id).unwrap().is_admin);
    assert!(!state.sessions().get(&a_id).unwrap().is_admin);
    let active = state.admin().active().await.unwrap();
    assert_eq!(active.session_id.as_deref(), Some(b_id.as_str()));
}

#[tokio::test]
async fn denied_candidate_is_told_why() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (b_id, b_tx, mut b_rx) = connect(&state);
    admin_service::websocket_login(&state, &b_id, &b_tx, PASSWORD).await;
    drain(&mut b_rx);

    let request = next_json(&mut a_rx);
    let request_id = request["requestId"].as_str().unwrap().parse().unwrap();

    admin_service::approve(&state, &admin_id, request_id, false)
        .await
        .unwrap();

    let outcome = next_json(&mut b_rx);
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["reason"], "admin_denied");
    assert!(!state.admin().take_grant(&b_id));
}

#[tokio::test]
async fn approving_a_departed_candidate_is_clean_and_idempotent() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (b_id, b_tx, b_rx) = connect(&state);
    admin_service::websocket_login(&state, &b_id, &b_tx, PASSWORD).await;

    let request = next_json(&mut a_rx);
    let request_id = request["requestId"].as_str().unwrap().parse().unwrap();

    // Candidate disconnects before the admin decides.
    drop(b_rx);
    state.remove_session(&b_id).await;

    admin_service::approve(&state, &admin_id, request_id, true)
        .await
        .unwrap();

    // Already resolved: the second attempt must not double-deliver.
    let second = admin_service::approve(&state, &admin_id, request_id, true).await;
    assert!(matches!(second, Err(ServiceError::RequestNotFound(_))));
    assert_eq!(state.admin().pending_len(), 0);
}

#[tokio::test]
async fn rebinding_the_admin_channel_demotes_the_old_connection() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;
    assert!(state.sessions().get(&a_id).unwrap().is_admin);

    // Same identity reconnects (browser reload) while the old socket is
    // still registered as half-open.
    let (b_id, b_tx, mut b_rx) = connect(&state);
    admin_service::complete_handshake(&state, &b_id, &b_tx, Some(admin_id.clone())).await;
    let bound = next_json(&mut b_rx);
    assert_eq!(bound["success"], true);

    let flagged = [&a_id, &b_id]
        .into_iter()
        .filter(|id| {
            state
                .sessions()
                .get(id.as_str())
                .is_some_and(|session| session.is_admin)
        })
        .count();
    assert_eq!(flagged, 1, "at most one session may carry the admin flag");
    assert!(state.sessions().get(&b_id).unwrap().is_admin);

    // The REST bind path demotes the displaced connection the same way.
    let (c_id, _c_tx, _c_rx) = connect(&state);
    admin_service::bind_channel(&state, &admin_id, &c_id)
        .await
        .unwrap();
    assert!(!state.sessions().get(&b_id).unwrap().is_admin);
    assert!(state.sessions().get(&c_id).unwrap().is_admin);
}

#[tokio::test]
async fn unanswered_approvals_expire_with_a_timeout_reason() {
    let state = AppState::new(AppConfig {
        admin_password: PASSWORD.into(),
        approval_timeout: Duration::ZERO,
        ..AppConfig::default()
    });
    let (a_id, a_tx, mut a_rx) = connect(&state);
    login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (b_id, b_tx, mut b_rx) = connect(&state);
    admin_service::websocket_login(&state, &b_id, &b_tx, PASSWORD).await;
    drain(&mut b_rx);
    assert_eq!(state.admin().pending_len(), 1);

    let expired = sweeper::expire_approvals(&state);
    assert_eq!(expired, 1);
    assert_eq!(state.admin().pending_len(), 0);

    let outcome = next_json(&mut b_rx);
    assert_eq!(outcome["type"], "admin_login_response");
    assert_eq!(outcome["success"], false);
    assert_eq!(outcome["reason"], "admin_timeout");
}

#[tokio::test]
async fn idle_eviction_tells_the_admin_who_left() {
    let state = AppState::new(AppConfig {
        admin_password: PASSWORD.into(),
        idle_timeout: Duration::from_millis(50),
        ..AppConfig::default()
    });
    let (a_id, a_tx, mut a_rx) = connect(&state);
    login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (p_id, _p_tx, mut p_rx) = connect(&state);
    tokio::time::sleep(Duration::from_millis(80)).await;
    state.sessions().touch(&a_id);

    let evicted = sweeper::evict_idle_sessions(&state).await;
    assert_eq!(evicted, 1);
    assert!(state.sessions().get(&p_id).is_none());
    assert!(state.sessions().get(&a_id).is_some());

    // Close frame to the evicted player, disconnect notice to the admin.
    assert!(matches!(p_rx.try_recv(), Ok(Message::Close(_))));
    let notice = next_json(&mut a_rx);
    assert_eq!(notice["type"], "player_disconnected");
    assert_eq!(notice["sessionId"], p_id.as_str());
}

#[tokio::test]
async fn takeover_displaces_the_admin_exactly_once() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let takeover = admin_service::force_takeover(&state, PASSWORD)
        .await
        .unwrap();

    let logout = next_json(&mut a_rx);
    assert_eq!(logout["type"], "force_logout");
    assert!(a_rx.try_recv().is_err(), "exactly one force_logout expected");
    assert!(state.sessions().get(&a_id).is_none());

    let (c_id, _c_tx, mut c_rx) = connect(&state);
    admin_service::bind_channel(&state, &takeover.session_id, &c_id)
        .await
        .unwrap();
    assert!(state.sessions().get(&c_id).unwrap().is_admin);
    drain(&mut c_rx);

    let wrong = admin_service::force_takeover(&state, "wrong").await;
    assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));
}

#[tokio::test]
async fn lock_all_counts_only_reached_sessions_and_evicts_dead_ones() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (b_id, _b_tx, mut b_rx) = connect(&state);
    let (c_id, _c_tx, c_rx) = connect(&state);
    let (d_id, _d_tx, mut d_rx) = connect(&state);
    drop(c_rx); // dead transport, session still registered

    let affected = admin_service::set_lock_all(&state, &admin_id, true)
        .await
        .unwrap();
    assert_eq!(affected, 2);
    assert!(state.sessions().get(&c_id).is_none());

    for rx in [&mut b_rx, &mut d_rx] {
        let status = next_json(rx);
        assert_eq!(status["type"], "lock_status");
        assert_eq!(status["locked"], true);
    }
    assert!(state.sessions().get(&b_id).unwrap().locked);
    assert!(state.sessions().get(&d_id).unwrap().locked);
}

#[tokio::test]
async fn start_game_reaches_players_and_progress_reaches_the_admin() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (p_id, p_tx, mut p_rx) = connect(&state);
    assert!(!state.game_started().await);

    admin_service::start_game(&state, &admin_id).await.unwrap();
    assert!(state.game_started().await);

    let started = next_json(&mut p_rx);
    assert_eq!(started["type"], "game_started");
    assert!(p_rx.try_recv().is_err(), "exactly one game_started expected");

    drain(&mut a_rx);
    let progress = json!({"difficulty": "medium", "solved": {"1": true}});
    session_service::handle_client_message(
        &state,
        &p_id,
        &p_tx,
        ClientMessage::ProgressUpdate {
            progress: progress.clone(),
        },
    )
    .await;

    let forwarded = next_json(&mut a_rx);
    assert_eq!(forwarded["type"], "progress_update");
    assert_eq!(forwarded["sessionId"], p_id.as_str());
    assert_eq!(forwarded["progress"], progress);
}

#[tokio::test]
async fn unlock_of_an_unlocked_session_still_pushes() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let (p_id, _p_tx, mut p_rx) = connect(&state);
    assert!(!state.sessions().get(&p_id).unwrap().locked);

    admin_service::set_lock(&state, &admin_id, &p_id, false)
        .await
        .unwrap();

    let status = next_json(&mut p_rx);
    assert_eq!(status["type"], "lock_status");
    assert_eq!(status["locked"], false);
    assert!(status.get("reason").is_none());
    assert!(!state.sessions().get(&p_id).unwrap().locked);
}

#[tokio::test]
async fn commands_from_a_non_admin_are_refused() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let result = admin_service::start_game(&state, "not-the-admin").await;
    assert!(matches!(result, Err(ServiceError::Unauthorized(_))));

    let (p_id, _p_tx, _p_rx) = connect(&state);
    let result = admin_service::set_lock(&state, &p_id, &p_id, true).await;
    assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
}

#[tokio::test]
async fn lock_against_a_vanished_target_reports_not_found() {
    let state = test_state();
    let (a_id, a_tx, mut a_rx) = connect(&state);
    let admin_id = login_admin(&state, &a_id, &a_tx, &mut a_rx).await;

    let result = admin_service::set_lock(&state, &admin_id, "gone", true).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn rest_login_mirrors_the_websocket_flow() {
    let state = test_state();

    let rejected = admin_service::rest_login(&state, "wrong").await;
    assert!(rejected.session_id.is_none());

    let accepted = admin_service::rest_login(&state, PASSWORD).await;
    let admin_id = accepted.session_id.expect("accepted login carries an id");
    assert!(accepted.request_id.is_none());

    let pending = admin_service::rest_login(&state, PASSWORD).await;
    assert!(pending.session_id.is_none());
    assert!(pending.request_id.is_some());

    // The HTTP-issued id authorizes commands once a channel is bound.
    let (c_id, _c_tx, mut c_rx) = connect(&state);
    admin_service::bind_channel(&state, &admin_id, &c_id)
        .await
        .unwrap();
    admin_service::start_game(&state, &admin_id).await.unwrap();
    let started = next_json(&mut c_rx);
    assert_eq!(started["type"], "game_started");
}

#[tokio::test]
async fn wrong_password_over_the_socket_is_rejected_in_band() {
    let state = test_state();
    let (p_id, p_tx, mut p_rx) = connect(&state);

    admin_service::websocket_login(&state, &p_id, &p_tx, "wrong").await;
    let response = next_json(&mut p_rx);
    assert_eq!(response["success"], false);
    assert_eq!(response["reason"], "invalid_credentials");
    assert!(state.admin().active().await.is_none());
}

#[tokio::test]
async fn player_events_land_in_the_analytics_log() {
    let state = test_state();
    let (p_id, p_tx, _p_rx) = connect(&state);
    state.sessions().set_name(&p_id, "Riddler");

    session_service::handle_client_message(
        &state,
        &p_id,
        &p_tx,
        ClientMessage::Event {
            event: "hint".into(),
            details: json!({"riddle": 3, "difficulty": "medium"}),
        },
    )
    .await;

    let events = state.analytics().dump().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "hint");
    assert_eq!(events[0].session_id, p_id);
    assert_eq!(events[0].player_name.as_deref(), Some("Riddler"));
}
