//! # HTTP Request Handlers
//!
//! Thin axum handlers over the pairing service:
//! - `health`: Liveness endpoint
//! - `auth`: Session creation/lookup and the four ceremony endpoints
//! - `users`: User listing
//! - `ws`: WebSocket endpoint feeding session updates to subscribers

pub mod auth;
pub mod health;
pub mod users;
pub mod ws;
