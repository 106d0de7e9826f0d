//! Registration pairing flow: the phone creates a passkey for a username
//! while the PC watches the session.

use serde_json::Value;
use uuid::Uuid;
use webauthn_rs::prelude::CreationChallengeResponse;

use crate::ceremony;
use crate::db;
use crate::db::models::{SessionKind, SessionStatus};
use crate::error::{AppError, AppResult};
use crate::hub::SessionEvent;
use crate::pairing::types::CeremonyFinish;
use crate::pairing::{fail_session, require_session};
use crate::state::AppState;

/// Begin registration against a pending session.
///
/// A username that already owns a completed credential is rejected; an
/// unbound record from an earlier abandoned attempt is reused. Claiming the
/// session binds the challenge and the user in the same write, so a racing
/// second start loses and is told the ceremony is already underway.
pub async fn start_registration(
    state: &AppState,
    session_id: &str,
    username: &str,
) -> AppResult<CreationChallengeResponse> {
    let session = require_session(state, session_id, SessionKind::Register).await?;

    if session.status != SessionStatus::Pending {
        return Err(AppError::InvalidSession(
            "ceremony already started".to_string(),
        ));
    }

    let user = match db::users::find_by_username(&state.db, username).await? {
        Some(existing) if existing.has_credential() => {
            return Err(AppError::AlreadyRegistered(format!(
                "username '{}' already registered",
                username
            )));
        }
        Some(existing) => existing,
        None => db::users::create(&state.db, username).await?,
    };

    let user_uuid = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Internal("invalid user id".to_string()))?;

    let (ccr, challenge_state) = ceremony::registration::build_registration_challenge(
        &state.webauthn,
        &state.policy,
        user_uuid,
        username,
    )?;

    let claimed = db::sessions::mark_scanned(
        &state.db,
        session_id,
        &challenge_state,
        Some(&user.id),
        Some(username),
    )
    .await?;
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

    tracing::info!(session_id, username, "registration ceremony started");

    Ok(ccr)
}

/// Complete registration with the credential the phone created.
///
/// Requires a session that went through `start_registration`: a finish on a
/// session with no bound challenge is invalid and mutates nothing, as is a
/// structurally malformed response. A response that parses but fails
/// verification moves the session to FAILED.
pub async fn finish_registration(
    state: &AppState,
    session_id: &str,
    response: &Value,
) -> AppResult<CeremonyFinish> {
    let session = require_session(state, session_id, SessionKind::Register).await?;

    let (Some(challenge), Some(user_id)) = (session.challenge.as_deref(), session.user_id.as_deref())
    else {
        return Err(AppError::InvalidSession("ceremony not started".to_string()));
    };
    if session.status != SessionStatus::Scanned {
        return Err(AppError::InvalidSession(
            "session already completed".to_string(),
        ));
    }

    let Some(verified) =
        ceremony::registration::verify_registration_response(&state.webauthn, challenge, response)?
    else {
        fail_session(state, session_id, None).await?;
        return Ok(CeremonyFinish::failed(None));
    };

    db::users::bind_credential(
        &state.db,
        user_id,
        &verified.credential_id,
        &verified.passkey_blob,
        verified.transports.as_deref(),
    )
    .await?;

    let claimed =
        db::sessions::mark_finished(&state.db, session_id, SessionStatus::Succeeded, None).await?;
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
            username: session.username.clone(),
        },
    );

    tracing::info!(session_id, username = ?session.username, "registration ceremony verified");

    Ok(CeremonyFinish::verified(session.username.clone()))
}
