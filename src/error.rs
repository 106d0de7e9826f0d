//! # Error Handling
//!
//! This module defines the application-wide error type and converts it into
//! HTTP responses.
//!
//! Two classes of failure are deliberately *not* represented here: a ceremony
//! response that simply does not verify, and an authentication response whose
//! credential matches no user. Those are routine, recoverable outcomes — the
//! pairing layer reports them as `{verified: false, ...}` and moves the
//! session to its failed state instead of returning an error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
///
/// The `#[from]` attributes let `?` convert library errors (database,
/// serialization, challenge building) into `AppError` automatically.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors (SQLx library errors)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// WebAuthn library errors raised while *building* a challenge.
    ///
    /// Verification failures never surface through this variant; the ceremony
    /// engine folds them into a not-verified result.
    #[error("WebAuthn error: {0}")]
    WebAuthn(#[from] webauthn_rs::prelude::WebauthnError),

    /// JSON serialization/deserialization errors for server-side state
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The referenced pairing session is missing, of the wrong kind, expired,
    /// or not in a state that allows the requested ceremony step
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// The username already owns a completed credential
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    /// Structurally invalid ceremony response, rejected before any session
    /// mutation (distinct from a response that parses but fails verification)
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Resource not found errors (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server errors (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response
///
/// Server faults are logged with their details and answered with a generic
/// message; client-facing errors carry their own text.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::WebAuthn(e) => {
                tracing::error!("WebAuthn error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ceremony error".to_string())
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::InvalidSession(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::AlreadyRegistered(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
