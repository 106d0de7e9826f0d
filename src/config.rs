//! # Configuration Management
//!
//! Configuration comes from environment variables (with a `.env` file for
//! local development).
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `DATABASE_URL`: SQLite database connection string
//! - `RP_ID`: WebAuthn Relying Party ID (usually your domain)
//! - `RP_ORIGIN`: WebAuthn Relying Party Origin (full URL)
//! - `RP_NAME`: Human-readable name for your service
//! - `SESSION_TTL_SECS`: Pairing session lifetime (default: 300)
//! - `RESIDENT_KEY_REQUIRED`: Request a device-resident key (default: true)
//! - `USER_VERIFICATION`: "required" or "preferred" (default: required)
//! - `AUTHENTICATOR_ATTACHMENT`: "platform" or "cross-platform"
//!   (default: platform)
//!
//! `RP_ID` and `RP_ORIGIN` are security critical: verification rejects any
//! ceremony response whose origin or relying-party identifier does not match
//! them exactly.

use anyhow::Result;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL, e.g. "sqlite:pairing.db?mode=rwc"
    pub database_url: String,

    /// WebAuthn Relying Party ID
    ///
    /// Must match the domain the phone-side ceremony runs against.
    /// For local development: "localhost".
    pub rp_id: String,

    /// WebAuthn Relying Party Origin (full URL, including protocol)
    pub rp_origin: String,

    /// Human-readable name shown to users during passkey creation
    pub rp_name: String,

    /// How long a pairing session stays usable after creation
    pub session_ttl_secs: i64,

    /// Authenticator selection policy applied to registration and
    /// authentication challenges
    pub policy: CeremonyPolicy,
}

/// User-verification requirement requested from the authenticator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserVerification {
    Required,
    Preferred,
}

/// Which class of authenticator the registration ceremony asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Platform,
    CrossPlatform,
}

/// Authenticator selection policy
///
/// These knobs shape the challenge options sent to the phone; they are policy
/// choices, not protocol-critical values.
#[derive(Debug, Clone)]
pub struct CeremonyPolicy {
    pub resident_key_required: bool,
    pub user_verification: UserVerification,
    pub attachment: Attachment,
}

impl Default for CeremonyPolicy {
    fn default() -> Self {
        Self {
            resident_key_required: true,
            user_verification: UserVerification::Required,
            attachment: Attachment::Platform,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Falls back to local-development defaults for anything unset and only
    /// fails on values that do not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let user_verification = match env::var("USER_VERIFICATION")
            .unwrap_or_else(|_| "required".to_string())
            .as_str()
        {
            "required" => UserVerification::Required,
            "preferred" => UserVerification::Preferred,
            other => anyhow::bail!("unsupported USER_VERIFICATION value '{other}'"),
        };

        let attachment = match env::var("AUTHENTICATOR_ATTACHMENT")
            .unwrap_or_else(|_| "platform".to_string())
            .as_str()
        {
            "platform" => Attachment::Platform,
            "cross-platform" => Attachment::CrossPlatform,
            other => anyhow::bail!("unsupported AUTHENTICATOR_ATTACHMENT value '{other}'"),
        };

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:pairing.db?mode=rwc".to_string()),

            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),

            rp_origin: env::var("RP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Pairing Demo".to_string()),

            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,

            policy: CeremonyPolicy {
                resident_key_required: env::var("RESIDENT_KEY_REQUIRED")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
                user_verification,
                attachment,
            },
        })
    }

    /// Socket address string for the TCP listener, e.g. "127.0.0.1:8080"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
