use pairing_auth_server::config::Config;
use pairing_auth_server::db;
use pairing_auth_server::handlers::auth::*;
use pairing_auth_server::handlers::health::health_check;
use pairing_auth_server::handlers::users::list_users;
use pairing_auth_server::handlers::ws::ws_handler;
use pairing_auth_server::state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pairing_auth_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config).await?;
    tracing::info!("Application state initialized");

    // Sweep expired sessions so the table does not accumulate dead rows.
    // Expiry itself is enforced on read; this is housekeeping only.
    let sweep_pool = app_state.db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            match db::sessions::delete_expired(&sweep_pool).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "expired pairing sessions swept"),
                Err(e) => tracing::error!("session sweep failed: {:?}", e),
            }
        }
    });

    // The phone reaches these endpoints from a different origin than the PC
    // page; restrict the origins in production.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        // PC side: create a session, poll its record
        .route("/api/auth/sessions", post(create_session))
        .route("/api/auth/sessions/:session_id", get(get_session))
        // Phone side: run a ceremony against the session
        .route("/api/auth/register/start", post(register_start))
        .route("/api/auth/register/finish", post(register_finish))
        .route("/api/auth/authenticate/start", post(authenticate_start))
        .route("/api/auth/authenticate/finish", post(authenticate_finish))
        // Real-time session updates
        .route("/ws", get(ws_handler))
        .route("/api/users", get(list_users))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
