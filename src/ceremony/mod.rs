//! # Ceremony Engine
//!
//! Stateless wrappers around the WebAuthn challenge/response ceremonies.
//!
//! Each ceremony is a single challenge/response round trip:
//! 1. A `build_*` function produces the options sent to the phone plus an
//!    opaque serialized state blob. The pairing layer stores that blob on the
//!    session as its challenge.
//! 2. A `verify_*` function checks the phone's response against the stored
//!    state. Challenge, origin and relying-party mismatches fail closed: they
//!    come back as a not-verified result (`Ok(None)`), never as an error.
//!    Only structurally invalid input errors out, before anything mutates.
//!
//! Nothing in this module touches the stores; callers hand in whatever record
//! data verification needs.

pub mod authentication;
pub mod registration;
