//! Request and response shapes for the pairing API.
//!
//! Field names are camelCase on the wire. Ceremony responses are accepted as
//! raw JSON and handed to the ceremony engine for parsing, so the full
//! WebAuthn structure never has to be restated here.

use serde::{Deserialize, Serialize};

use crate::db::models::SessionKind;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Which ceremony this session will run: "register" or "authenticate"
    pub kind: SessionKind,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRegistrationRequest {
    pub session_id: String,
    /// Username the new credential will belong to
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRegistrationRequest {
    pub session_id: String,
    /// The credential created by the phone's WebAuthn API
    pub response: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAuthenticationRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishAuthenticationRequest {
    pub session_id: String,
    /// The signed assertion from the phone's WebAuthn API
    pub response: serde_json::Value,
}

/// Outcome of a ceremony finish step.
///
/// `verified: false` covers both a response that failed verification and an
/// authentication whose credential matched no user; the latter carries an
/// `error` text so the phone can tell the difference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyFinish {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CeremonyFinish {
    pub fn verified(username: Option<String>) -> Self {
        Self {
            verified: true,
            username,
            error: None,
        }
    }

    pub fn failed(error: Option<&str>) -> Self {
        Self {
            verified: false,
            username: None,
            error: error.map(str::to_string),
        }
    }
}
