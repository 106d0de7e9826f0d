//! # Database Module
//!
//! Store modules over the shared SQLite pool:
//! - `models`: Row types (PairingSession, UserRecord)
//! - `sessions`: Pairing session store with guarded state transitions
//! - `users`: User/credential store
//!
//! All access goes through these functions; nothing else in the crate touches
//! the tables directly. Per-record writes are single guarded UPDATE
//! statements, so two actors racing on the same row serialize at the database
//! and exactly one of them claims the transition.

pub mod models;
pub mod sessions;
pub mod users;
