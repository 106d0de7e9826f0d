//! # Database Models
//!
//! Row types for the two tables the service owns: `sessions` (ephemeral
//! pairing sessions) and `users` (user identity plus passkey credential
//! material).
//!
//! Timestamps are stored as RFC3339 text, which SQLite compares correctly as
//! strings for a fixed UTC offset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Which ceremony a pairing session runs. Fixed at creation, never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionKind {
    Register,
    Authenticate,
}

/// Pairing session state machine: pending → scanned → {succeeded, failed}.
///
/// Status only moves forward; the store enforces this with guarded updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Scanned,
    Succeeded,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Succeeded | SessionStatus::Failed)
    }
}

/// A short-lived session linking the PC that created it to the phone-side
/// ceremony.
///
/// `challenge`, `user_id` and `username` are write-once: they are set at the
/// scanned transition and never reassigned. `challenge` holds the serialized
/// ceremony state produced by the ceremony engine and is opaque to everything
/// else.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PairingSession {
    /// Unique session token (UUID v4); doubles as the notification channel key
    pub id: String,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub challenge: Option<Vec<u8>>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    /// RFC3339 timestamp
    pub created_at: String,
    /// RFC3339 timestamp; fixed at creation to created_at + session TTL
    pub expires_at: String,
}

impl PairingSession {
    pub fn new(kind: SessionKind, ttl_secs: i64) -> Self {
        let now = Utc::now();
        let expires = now + chrono::Duration::seconds(ttl_secs);

        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            status: SessionStatus::Pending,
            challenge: None,
            user_id: None,
            username: None,
            created_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
        }
    }

    /// Whether the session's expiry has passed.
    ///
    /// Expired sessions are invalid for every ceremony operation regardless of
    /// their stored status.
    pub fn is_expired(&self) -> AppResult<bool> {
        let expires_at = DateTime::parse_from_rfc3339(&self.expires_at)
            .map_err(|_| AppError::Internal("Invalid expiration timestamp".to_string()))?;

        Ok(Utc::now() > expires_at)
    }
}

/// A user and, once registration completes, their passkey credential.
///
/// A record without key material is an unbound registration attempt; a later
/// registration for the same username may overwrite it. `credential_id` is
/// the canonical base64url encoding of the credential identifier and is the
/// lookup key for authentication.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub credential_id: Option<String>,
    /// Serialized passkey (public key plus metadata), set on verified
    /// registration only
    pub public_key: Option<Vec<u8>>,
    /// Signature counter asserted by the device; monotonically increasing
    pub counter: i64,
    /// JSON array of transport hints declared at registration
    pub transports: Option<String>,
    pub created_at: String,
}

impl UserRecord {
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            credential_id: None,
            public_key: None,
            counter: 0,
            transports: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// A completed registration has key material; an unbound record does not.
    pub fn has_credential(&self) -> bool {
        self.public_key.is_some()
    }
}

/// Listing row for the user enumeration endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub created_at: String,
}
