//! # Pairing Service
//!
//! Orchestrates a pairing round: the PC creates a session and watches it, the
//! phone runs a ceremony against it, and every state change is pushed to the
//! session's channel after it commits.
//!
//! ## Flow
//! 1. PC → `sessions::create_session` → renders the session id for the phone
//!    and subscribes to its channel.
//! 2. Phone → `registration::start` / `authentication::start` → session is
//!    claimed (pending → scanned) and the challenge bound.
//! 3. Phone → `registration::finish` / `authentication::finish` → response is
//!    verified, credential material persisted, session moved to its terminal
//!    state.
//!
//! Invalid, expired or already-claimed sessions are rejected before anything
//! mutates. Verification failures and unknown credentials are reported as
//! `{verified: false}` outcomes with a failed transition, not as errors.

pub mod authentication;
pub mod registration;
pub mod sessions;
pub mod types;

use crate::db;
use crate::db::models::{PairingSession, SessionKind, SessionStatus};
use crate::error::{AppError, AppResult};
use crate::hub::SessionEvent;
use crate::state::AppState;

/// Fetch a session and check the preconditions shared by every ceremony
/// operation: it exists, is of the expected kind and has not expired.
///
/// Expiry wins over stored status: a session past its window is invalid here
/// no matter what the row says.
pub(crate) async fn require_session(
    state: &AppState,
    session_id: &str,
    kind: SessionKind,
) -> AppResult<PairingSession> {
    let Some(session) = db::sessions::get(&state.db, session_id).await? else {
        return Err(AppError::InvalidSession("unknown session".to_string()));
    };

    if session.kind != kind {
        return Err(AppError::InvalidSession("wrong session kind".to_string()));
    }

    if session.is_expired()? {
        return Err(AppError::InvalidSession("session expired".to_string()));
    }

    Ok(session)
}

/// Move a session to FAILED and push the event, if this caller claims the
/// transition. Losing the claim means another actor already finished the
/// session and published its own event.
pub(crate) async fn fail_session(
    state: &AppState,
    session_id: &str,
    username: Option<&str>,
) -> AppResult<()> {
    let claimed =
        db::sessions::mark_finished(&state.db, session_id, SessionStatus::Failed, username).await?;

    if claimed {
        state.hub.publish(
            session_id,
            &SessionEvent {
                session_id: session_id.to_string(),
                status: SessionStatus::Failed,
                username: username.map(str::to_string),
            },
        );
    }

    Ok(())
}
