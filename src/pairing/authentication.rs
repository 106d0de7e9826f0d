//! Authentication pairing flow: the phone asserts an existing passkey and
//! the PC learns who signed in.

use serde_json::Value;
use webauthn_rs::prelude::RequestChallengeResponse;

use crate::ceremony;
use crate::db;
use crate::db::models::{SessionKind, SessionStatus};
use crate::error::{AppError, AppResult};
use crate::hub::SessionEvent;
use crate::pairing::types::CeremonyFinish;
use crate::pairing::{fail_session, require_session};
use crate::state::AppState;

/// Begin authentication against a pending session.
///
/// No username is taken and no allow-list is built: the phone offers
/// whichever resident credential it holds for this relying party, and the
/// user is resolved at finish time from the response's credential id.
pub async fn start_authentication(
    state: &AppState,
    session_id: &str,
) -> AppResult<RequestChallengeResponse> {
    let session = require_session(state, session_id, SessionKind::Authenticate).await?;

    if session.status != SessionStatus::Pending {
        return Err(AppError::InvalidSession(
            "ceremony already started".to_string(),
        ));
    }

    let (rcr, challenge_state) =
        ceremony::authentication::build_authentication_challenge(&state.webauthn, &state.policy)?;

    let claimed =
        db::sessions::mark_scanned(&state.db, session_id, &challenge_state, None, None).await?;
    if !claimed {
        return Err(AppError::InvalidSession(
            "ceremony already started".to_string(),
        ));
    }

    state.hub.publish(
        session_id,
        &SessionEvent {
            session_id: session_id.to_string(),
            status: SessionStatus::Scanned,
            username: None,
        },
    );

    tracing::info!(session_id, "authentication ceremony started");

    Ok(rcr)
}

/// Complete authentication with the phone's signed assertion.
///
/// The credential id embedded in the response resolves the user before the
/// verifier ever runs; a miss fails the session with a "User not found"
/// outcome rather than an error. On success the asserted signature counter is
/// persisted through a guarded update — losing that update to a concurrent
/// authentication means the counter went stale underneath us, which gets the
/// same replay treatment as a non-advancing counter.
pub async fn finish_authentication(
    state: &AppState,
    session_id: &str,
    response: &Value,
) -> AppResult<CeremonyFinish> {
    let session = require_session(state, session_id, SessionKind::Authenticate).await?;

    let Some(challenge) = session.challenge.as_deref() else {
        return Err(AppError::InvalidSession("ceremony not started".to_string()));
    };
    if session.status != SessionStatus::Scanned {
        return Err(AppError::InvalidSession(
            "session already completed".to_string(),
        ));
    }

    let Some(credential_id) = response.get("id").and_then(Value::as_str) else {
        return Err(AppError::MalformedRequest(
            "response is missing the credential id".to_string(),
        ));
    };

    let Some(user) = db::users::find_by_credential_id(&state.db, credential_id).await? else {
        tracing::info!(session_id, "no credential matches authentication response");
        fail_session(state, session_id, None).await?;
        return Ok(CeremonyFinish::failed(Some("User not found")));
    };

    let Some(verified) = ceremony::authentication::verify_authentication_response(
        &state.webauthn,
        challenge,
        response,
        &user,
    )?
    else {
        fail_session(state, session_id, None).await?;
        return Ok(CeremonyFinish::failed(None));
    };

    let counter_advanced = db::users::update_credential_counter(
        &state.db,
        &user.id,
        verified.new_counter,
        &verified.passkey_blob,
    )
    .await?;
    if !counter_advanced {
        tracing::info!(
            session_id,
            username = %user.username,
            "signature counter already surpassed, rejecting as replay"
        );
        fail_session(state, session_id, None).await?;
        return Ok(CeremonyFinish::failed(None));
    }

    let claimed = db::sessions::mark_finished(
        &state.db,
        session_id,
        SessionStatus::Succeeded,
        Some(&user.username),
    )
    .await?;
    if !claimed {
        return Err(AppError::InvalidSession(
            "session already completed".to_string(),
        ));
    }

    state.hub.publish(
        session_id,
        &SessionEvent {
            session_id: session_id.to_string(),
            status: SessionStatus::Succeeded,
            username: Some(user.username.clone()),
        },
    );

    tracing::info!(session_id, username = %user.username, "authentication ceremony verified");

    Ok(CeremonyFinish::verified(Some(user.username)))
}
