use crate::db::models::{PairingSession, SessionKind, SessionStatus};
use crate::error::AppResult;
use chrono::Utc;
use sqlx::SqlitePool;

pub async fn create(pool: &SqlitePool, kind: SessionKind, ttl_secs: i64) -> AppResult<PairingSession> {
    let session = PairingSession::new(kind, ttl_secs);

    sqlx::query(
        "INSERT INTO sessions (id, kind, status, created_at, expires_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(session.kind)
    .bind(session.status)
    .bind(&session.created_at)
    .bind(&session.expires_at)
    .execute(pool)
    .await?;

    Ok(session)
}

pub async fn get(pool: &SqlitePool, session_id: &str) -> AppResult<Option<PairingSession>> {
    let session = sqlx::query_as::<_, PairingSession>("SELECT * FROM sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

/// Claim the pending → scanned transition, binding the ceremony state and the
/// user the session operates on in the same write.
///
/// The status guard makes this a compare-and-swap: of two racing starts only
/// one claims the row, and the write-once fields are never reassigned.
/// Returns whether this caller won the transition.
pub async fn mark_scanned(
    pool: &SqlitePool,
    session_id: &str,
    challenge_state: &[u8],
    user_id: Option<&str>,
    username: Option<&str>,
) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE sessions
         SET status = ?, challenge = ?, user_id = ?, username = ?
         WHERE id = ? AND status = ?",
    )
    .bind(SessionStatus::Scanned)
    .bind(challenge_state)
    .bind(user_id)
    .bind(username)
    .bind(session_id)
    .bind(SessionStatus::Pending)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Claim the scanned → terminal transition. `username` is bound here for
/// authentication sessions, where the user is only known once the response
/// resolves; `COALESCE` keeps an already-bound name.
pub async fn mark_finished(
    pool: &SqlitePool,
    session_id: &str,
    status: SessionStatus,
    username: Option<&str>,
) -> AppResult<bool> {
    debug_assert!(status.is_terminal());

    let result = sqlx::query(
        "UPDATE sessions
         SET status = ?, username = COALESCE(?, username)
         WHERE id = ? AND status = ?",
    )
    .bind(status)
    .bind(username)
    .bind(session_id)
    .bind(SessionStatus::Scanned)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Sweeper support; correctness never depends on this, expiry is enforced on
// read.
pub async fn delete_expired(pool: &SqlitePool) -> AppResult<u64> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(&now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
