use crate::db::models::{UserRecord, UserSummary};
use crate::error::{AppError, AppResult};
use sqlx::SqlitePool;

pub async fn create(pool: &SqlitePool, username: &str) -> AppResult<UserRecord> {
    let user = UserRecord::new(username.to_string());

    sqlx::query(
        "INSERT INTO users (id, username, counter, created_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(user.counter)
    .bind(&user.created_at)
    .execute(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> AppResult<UserRecord> {
    let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                AppError::NotFound(format!("User with id '{}' not found", user_id))
            }
            _ => AppError::Database(e),
        })?;

    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Exact-match lookup on the canonical credential id. Authentication treats a
/// miss here as "user not found" without ever invoking the verifier.
pub async fn find_by_credential_id(
    pool: &SqlitePool,
    credential_id: &str,
) -> AppResult<Option<UserRecord>> {
    let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE credential_id = ?")
        .bind(credential_id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Attach verified key material to a user after a successful registration
/// ceremony. Overwrites whatever the record held before, which is how a
/// previously unbound attempt gets completed.
///
/// `credential_id` is globally unique; binding a credential that already
/// belongs to another user is rejected.
pub async fn bind_credential(
    pool: &SqlitePool,
    user_id: &str,
    credential_id: &str,
    passkey_blob: &[u8],
    transports: Option<&str>,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE users
         SET credential_id = ?, public_key = ?, counter = 0, transports = ?
         WHERE id = ?",
    )
    .bind(credential_id)
    .bind(passkey_blob)
    .bind(transports)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            AppError::AlreadyRegistered("credential already bound to another user".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User with id '{}' not found",
            user_id
        )));
    }

    Ok(())
}

/// Persist the signature counter asserted by a verified authentication.
///
/// The `counter < ?` guard is the per-record serialization for concurrent
/// authentications against the same credential: a stale counter never
/// overwrites a newer one, and the caller treats a lost race as a replay.
/// Returns whether the counter advanced.
pub async fn update_credential_counter(
    pool: &SqlitePool,
    user_id: &str,
    new_counter: u32,
    passkey_blob: &[u8],
) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE users
         SET counter = ?, public_key = ?
         WHERE id = ? AND counter < ?",
    )
    .bind(new_counter as i64)
    .bind(passkey_blob)
    .bind(user_id)
    .bind(new_counter as i64)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<UserSummary>> {
    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, created_at FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}
