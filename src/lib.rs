//! # Cross-Device Pairing Authentication Server
//!
//! Passwordless authentication pairing: a stationary client (the PC) creates
//! a short-lived session and watches it while a mobile client (the phone)
//! runs a WebAuthn ceremony — registration or authentication — against it.
//! State changes are pushed to the PC over a per-session channel, with the
//! stored session record as the polled source of truth.

pub mod ceremony;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod pairing;
pub mod state;
