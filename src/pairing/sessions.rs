use crate::db;
use crate::db::models::{PairingSession, SessionKind};
use crate::error::AppResult;
use crate::state::AppState;

/// Create a fresh pairing session for the PC to render and watch.
///
/// Creation is unauthenticated by design: the session id is an unguessable
/// capability and the session dies after its TTL.
pub async fn create_session(state: &AppState, kind: SessionKind) -> AppResult<PairingSession> {
    let session = db::sessions::create(&state.db, kind, state.session_ttl_secs).await?;

    tracing::debug!(session_id = %session.id, kind = ?kind, "pairing session created");

    Ok(session)
}

/// Read a session's current record. The stored record is the source of truth
/// the PC polls; pushes only shortcut the wait.
pub async fn get_session(state: &AppState, session_id: &str) -> AppResult<Option<PairingSession>> {
    db::sessions::get(&state.db, session_id).await
}
