use crate::error::{AppError, AppResult};
use crate::pairing::types::*;
use crate::pairing::{authentication, registration, sessions};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

// Session endpoints (PC side)

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<Json<Value>> {
    let session = sessions::create_session(&state, req.kind).await?;

    Ok(Json(json!({
        "sessionId": session.id,
        "expiresAt": session.expires_at,
    })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<Value>> {
    let session = sessions::get_session(&state, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", session_id)))?;

    Ok(Json(json!({
        "id": session.id,
        "kind": session.kind,
        "status": session.status,
        "username": session.username,
        "expiresAt": session.expires_at,
    })))
}

// Ceremony endpoints (phone side)

pub async fn register_start(
    State(state): State<AppState>,
    Json(req): Json<StartRegistrationRequest>,
) -> AppResult<Json<Value>> {
    let ccr = registration::start_registration(&state, &req.session_id, &req.username).await?;

    Ok(Json(json!(ccr)))
}

pub async fn register_finish(
    State(state): State<AppState>,
    Json(req): Json<FinishRegistrationRequest>,
) -> AppResult<Json<CeremonyFinish>> {
    let outcome = registration::finish_registration(&state, &req.session_id, &req.response).await?;

    Ok(Json(outcome))
}

pub async fn authenticate_start(
    State(state): State<AppState>,
    Json(req): Json<StartAuthenticationRequest>,
) -> AppResult<Json<Value>> {
    let rcr = authentication::start_authentication(&state, &req.session_id).await?;

    Ok(Json(json!(rcr)))
}

pub async fn authenticate_finish(
    State(state): State<AppState>,
    Json(req): Json<FinishAuthenticationRequest>,
) -> AppResult<Json<CeremonyFinish>> {
    let outcome =
        authentication::finish_authentication(&state, &req.session_id, &req.response).await?;

    Ok(Json(outcome))
}
