//! Service-level tests for the pairing flows.
//!
//! Correctness is asserted by polling the stored session record; hub events
//! are checked on top of that, never instead of it. Ceremony responses that
//! would need a real authenticator are out of reach here, so these tests
//! drive every path up to and around the verifier: session lifecycle, expiry,
//! claim races, malformed input and credential resolution.

use pairing_auth_server::config::CeremonyPolicy;
use pairing_auth_server::db;
use pairing_auth_server::db::models::{SessionKind, SessionStatus};
use pairing_auth_server::error::AppError;
use pairing_auth_server::hub::NotificationHub;
use pairing_auth_server::pairing::{authentication, registration, sessions};
use pairing_auth_server::state::AppState;

use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::sync::mpsc;
use webauthn_rs::prelude::{Url, WebauthnBuilder};

async fn test_state() -> AppState {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&db).await.unwrap();

    let rp_origin = Url::parse("http://localhost:8080").unwrap();
    let webauthn = Arc::new(
        WebauthnBuilder::new("localhost", &rp_origin)
            .unwrap()
            .rp_name("Pairing Test")
            .build()
            .unwrap(),
    );

    AppState {
        db,
        webauthn,
        hub: NotificationHub::new(),
        session_ttl_secs: 300,
        policy: CeremonyPolicy::default(),
    }
}

async fn force_expire(state: &AppState, session_id: &str) {
    let past = (chrono::Utc::now() - chrono::Duration::minutes(10)).to_rfc3339();
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
        .bind(past)
        .bind(session_id)
        .execute(&state.db)
        .await
        .unwrap();
}

async fn stored_session(state: &AppState, session_id: &str) -> pairing_auth_server::db::models::PairingSession {
    db::sessions::get(&state.db, session_id).await.unwrap().unwrap()
}

#[tokio::test]
async fn created_session_is_pending_and_unexpired() {
    let state = test_state().await;

    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();

    assert_eq!(session.status, SessionStatus::Pending);
    assert!(!session.is_expired().unwrap());

    let stored = stored_session(&state, &session.id).await;
    assert_eq!(stored.kind, SessionKind::Register);
    assert_eq!(stored.status, SessionStatus::Pending);
    assert!(stored.challenge.is_none());
}

#[tokio::test]
async fn unknown_session_reads_as_none() {
    let state = test_state().await;

    let found = sessions::get_session(&state, "no-such-session").await.unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn registration_start_claims_session_and_binds_user() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.hub.subscribe(&session.id, tx);

    registration::start_registration(&state, &session.id, "alice").await.unwrap();

    let stored = stored_session(&state, &session.id).await;
    assert_eq!(stored.status, SessionStatus::Scanned);
    assert_eq!(stored.username.as_deref(), Some("alice"));
    assert!(stored.user_id.is_some());
    assert!(!stored.challenge.unwrap().is_empty());

    // The user record exists but carries no key material yet.
    let user = db::users::find_by_username(&state.db, "alice").await.unwrap().unwrap();
    assert!(!user.has_credential());

    let event = rx.try_recv().unwrap();
    assert_eq!(event.session_id, session.id);
    assert_eq!(event.status, SessionStatus::Scanned);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn registration_start_rejects_wrong_session_kind() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Authenticate).await.unwrap();

    let err = registration::start_registration(&state, &session.id, "alice")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Pending);
}

#[tokio::test]
async fn registration_start_rejects_expired_session() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();
    force_expire(&state, &session.id).await;

    let err = registration::start_registration(&state, &session.id, "alice")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
    // Stored status is untouched; expiry is enforced on read.
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Pending);
}

#[tokio::test]
async fn registration_start_rejects_unknown_session() {
    let state = test_state().await;

    let err = registration::start_registration(&state, "no-such-session", "alice")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
}

#[tokio::test]
async fn completed_username_cannot_register_again() {
    let state = test_state().await;
    let user = db::users::create(&state.db, "alice").await.unwrap();
    db::users::bind_credential(&state.db, &user.id, "cred-alice", b"passkey-blob", None)
        .await
        .unwrap();

    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();
    let err = registration::start_registration(&state, &session.id, "alice")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AlreadyRegistered(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Pending);
}

#[tokio::test]
async fn unbound_record_is_reused_on_a_second_attempt() {
    let state = test_state().await;
    let existing = db::users::create(&state.db, "bob").await.unwrap();

    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();
    registration::start_registration(&state, &session.id, "bob").await.unwrap();

    let stored = stored_session(&state, &session.id).await;
    assert_eq!(stored.user_id.as_deref(), Some(existing.id.as_str()));

    let users = db::users::list(&state.db).await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn a_session_only_starts_one_ceremony() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();

    registration::start_registration(&state, &session.id, "alice").await.unwrap();
    let err = registration::start_registration(&state, &session.id, "alice")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
    // The first claim's binding survives.
    let stored = stored_session(&state, &session.id).await;
    assert_eq!(stored.status, SessionStatus::Scanned);
    assert_eq!(stored.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn registration_finish_before_start_mutates_nothing() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.hub.subscribe(&session.id, tx);

    let err = registration::finish_registration(&state, &session.id, &serde_json::json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Pending);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn malformed_registration_finish_is_rejected_without_mutation() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();
    registration::start_registration(&state, &session.id, "alice").await.unwrap();

    let err = registration::finish_registration(&state, &session.id, &serde_json::json!({"foo": 1}))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::MalformedRequest(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Scanned);
}

#[tokio::test]
async fn scanned_session_past_expiry_rejects_finish() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Register).await.unwrap();
    registration::start_registration(&state, &session.id, "alice").await.unwrap();
    force_expire(&state, &session.id).await;

    let err = registration::finish_registration(&state, &session.id, &serde_json::json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Scanned);
}

#[tokio::test]
async fn authentication_start_claims_session_without_binding_a_user() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Authenticate).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.hub.subscribe(&session.id, tx);

    authentication::start_authentication(&state, &session.id).await.unwrap();

    let stored = stored_session(&state, &session.id).await;
    assert_eq!(stored.status, SessionStatus::Scanned);
    assert!(stored.user_id.is_none());
    assert!(stored.username.is_none());
    assert!(!stored.challenge.unwrap().is_empty());

    assert_eq!(rx.try_recv().unwrap().status, SessionStatus::Scanned);
}

#[tokio::test]
async fn authentication_finish_with_unknown_credential_fails_the_session() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Authenticate).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.hub.subscribe(&session.id, tx);

    authentication::start_authentication(&state, &session.id).await.unwrap();

    let outcome = authentication::finish_authentication(
        &state,
        &session.id,
        &serde_json::json!({"id": "no-such-credential"}),
    )
    .await
    .unwrap();

    assert!(!outcome.verified);
    assert_eq!(outcome.error.as_deref(), Some("User not found"));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Failed);

    // Exactly one event per transition: scanned, then failed, then nothing.
    assert_eq!(rx.try_recv().unwrap().status, SessionStatus::Scanned);
    assert_eq!(rx.try_recv().unwrap().status, SessionStatus::Failed);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn authentication_finish_before_start_is_invalid() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Authenticate).await.unwrap();

    let err = authentication::finish_authentication(
        &state,
        &session.id,
        &serde_json::json!({"id": "whatever"}),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Pending);
}

#[tokio::test]
async fn authentication_finish_without_credential_id_is_malformed() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Authenticate).await.unwrap();
    authentication::start_authentication(&state, &session.id).await.unwrap();

    let err = authentication::finish_authentication(&state, &session.id, &serde_json::json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::MalformedRequest(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Scanned);
}

#[tokio::test]
async fn failed_session_accepts_no_further_finish() {
    let state = test_state().await;
    let session = sessions::create_session(&state, SessionKind::Authenticate).await.unwrap();
    authentication::start_authentication(&state, &session.id).await.unwrap();

    let outcome = authentication::finish_authentication(
        &state,
        &session.id,
        &serde_json::json!({"id": "no-such-credential"}),
    )
    .await
    .unwrap();
    assert!(!outcome.verified);

    let err = authentication::finish_authentication(
        &state,
        &session.id,
        &serde_json::json!({"id": "no-such-credential"}),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::InvalidSession(_)));
    assert_eq!(stored_session(&state, &session.id).await.status, SessionStatus::Failed);
}
