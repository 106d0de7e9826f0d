//! # Application State
//!
//! Shared resources handed to every request handler: the database pool, the
//! WebAuthn instance, the notification hub and the policy knobs. Axum clones
//! the state per request; everything in it is cheap to clone and thread-safe.

use crate::config::{CeremonyPolicy, Config};
use crate::hub::NotificationHub;
use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use webauthn_rs::prelude::*;

#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// WebAuthn instance for building and verifying ceremonies, configured
    /// with the relying-party identity every response is checked against
    pub webauthn: Arc<Webauthn>,

    /// Subscriber registry for session state-change pushes
    pub hub: NotificationHub,

    /// Pairing session lifetime
    pub session_ttl_secs: i64,

    /// Authenticator selection policy
    pub policy: CeremonyPolicy,
}

impl AppState {
    /// Connect to the database, run migrations and configure WebAuthn.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = SqlitePool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&db).await?;

        let rp_origin = Url::parse(&config.rp_origin)?;
        let builder = WebauthnBuilder::new(&config.rp_id, &rp_origin)?.rp_name(&config.rp_name);
        let webauthn = Arc::new(builder.build()?);

        Ok(AppState {
            db,
            webauthn,
            hub: NotificationHub::new(),
            session_ttl_secs: config.session_ttl_secs,
            policy: config.policy.clone(),
        })
    }
}
