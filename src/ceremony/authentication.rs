//! Authentication ceremony: challenge building and assertion verification.

use serde_json::Value;
use webauthn_rs::prelude::*;

use crate::config::{CeremonyPolicy, UserVerification};
use crate::db::models::UserRecord;
use crate::error::{AppError, AppResult};

/// Result of a verified authentication assertion.
pub struct VerifiedAuthentication {
    /// Signature counter asserted by the device; strictly greater than the
    /// stored counter or verification would have failed
    pub new_counter: u32,
    /// Re-serialized passkey carrying the updated counter
    pub passkey_blob: Vec<u8>,
}

/// Build request options for authentication.
///
/// The options deliberately carry no allow-list: any credential the device
/// holds for this relying party may answer, which is what lets the phone pick
/// a resident passkey without the server knowing the user up front.
pub fn build_authentication_challenge(
    webauthn: &Webauthn,
    policy: &CeremonyPolicy,
) -> AppResult<(RequestChallengeResponse, Vec<u8>)> {
    let (mut rcr, auth_state) = webauthn
        .start_discoverable_authentication()
        .map_err(AppError::WebAuthn)?;

    rcr.public_key.user_verification = match policy.user_verification {
        UserVerification::Required => UserVerificationPolicy::Required,
        UserVerification::Preferred => UserVerificationPolicy::Preferred,
    };

    let state_bytes = serde_json::to_vec(&auth_state)?;

    Ok((rcr, state_bytes))
}

/// Verify the phone's assertion against the stored credential.
///
/// Fails closed: signature, challenge, origin or RP mismatches and replayed
/// signature counters all come back as `Ok(None)`. A counter at or below the
/// stored value means the assertion was replayed or the credential cloned,
/// and is rejected even when the signature itself checks out.
pub fn verify_authentication_response(
    webauthn: &Webauthn,
    challenge_state: &[u8],
    response: &Value,
    stored: &UserRecord,
) -> AppResult<Option<VerifiedAuthentication>> {
    let auth_state: DiscoverableAuthentication = serde_json::from_slice(challenge_state)?;

    let credential: PublicKeyCredential = serde_json::from_value(response.clone())
        .map_err(|e| AppError::MalformedRequest(format!("invalid authentication response: {e}")))?;

    let Some(blob) = stored.public_key.as_deref() else {
        // Unbound record: registration never completed, nothing to verify
        // against.
        return Ok(None);
    };
    let mut passkey: Passkey = serde_json::from_slice(blob)?;

    let keys = [DiscoverableKey::from(&passkey)];
    let result = match webauthn.finish_discoverable_authentication(&credential, auth_state, &keys) {
        Ok(result) => result,
        Err(e) => {
            tracing::info!("authentication response failed verification: {e}");
            return Ok(None);
        }
    };

    let new_counter = result.counter();
    if i64::from(new_counter) <= stored.counter {
        tracing::info!(
            username = %stored.username,
            stored = stored.counter,
            asserted = new_counter,
            "signature counter did not advance, rejecting as replay"
        );
        return Ok(None);
    }

    let _ = passkey.update_credential(&result);
    let passkey_blob = serde_json::to_vec(&passkey)?;

    Ok(Some(VerifiedAuthentication {
        new_counter,
        passkey_blob,
    }))
}
