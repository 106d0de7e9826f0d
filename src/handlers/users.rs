use crate::db;
use crate::error::AppResult;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// GET /api/users
///
/// Lists registered users (id, username, creation time). Credential ids and
/// key material are never exposed here.
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let users = db::users::list(&state.db).await?;

    Ok(Json(json!(users)))
}
