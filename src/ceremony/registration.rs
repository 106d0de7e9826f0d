//! Registration ceremony: challenge building and response verification.

use base64::prelude::*;
use serde_json::Value;
use webauthn_rs::prelude::*;

use crate::config::{Attachment, CeremonyPolicy, UserVerification};
use crate::error::{AppError, AppResult};

/// Credential material extracted from a verified registration response.
///
/// `credential_id` is the canonical base64url (no padding) encoding of the
/// credential identifier — byte for byte the `id` the browser will send in
/// every future authentication response, so it can serve directly as the
/// authentication lookup key.
pub struct VerifiedRegistration {
    pub credential_id: String,
    pub passkey_blob: Vec<u8>,
    pub transports: Option<String>,
}

/// Build creation options for a new passkey bound to `user_id`.
///
/// Returns the options for the phone and the serialized registration state
/// the verification step needs.
pub fn build_registration_challenge(
    webauthn: &Webauthn,
    policy: &CeremonyPolicy,
    user_id: Uuid,
    username: &str,
) -> AppResult<(CreationChallengeResponse, Vec<u8>)> {
    let (mut ccr, reg_state) = webauthn
        .start_passkey_registration(user_id, username, username, None)
        .map_err(AppError::WebAuthn)?;

    apply_policy(&mut ccr, policy);

    let state_bytes = serde_json::to_vec(&reg_state)?;

    Ok((ccr, state_bytes))
}

/// Verify the credential the phone created.
///
/// `Ok(None)` is the routine not-verified outcome (challenge, origin or RP
/// mismatch, bad signature). A response that does not even parse is a
/// malformed request instead.
pub fn verify_registration_response(
    webauthn: &Webauthn,
    challenge_state: &[u8],
    response: &Value,
) -> AppResult<Option<VerifiedRegistration>> {
    let reg_state: PasskeyRegistration = serde_json::from_slice(challenge_state)?;

    let credential: RegisterPublicKeyCredential = serde_json::from_value(response.clone())
        .map_err(|e| AppError::MalformedRequest(format!("invalid registration response: {e}")))?;

    let passkey = match webauthn.finish_passkey_registration(&credential, &reg_state) {
        Ok(passkey) => passkey,
        Err(e) => {
            tracing::info!("registration response failed verification: {e}");
            return Ok(None);
        }
    };

    let credential_id = BASE64_URL_SAFE_NO_PAD.encode(passkey.cred_id());

    let transports = credential
        .response
        .transports
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let passkey_blob = serde_json::to_vec(&passkey)?;

    Ok(Some(VerifiedRegistration {
        credential_id,
        passkey_blob,
        transports,
    }))
}

fn apply_policy(ccr: &mut CreationChallengeResponse, policy: &CeremonyPolicy) {
    if let Some(selection) = ccr.public_key.authenticator_selection.as_mut() {
        selection.authenticator_attachment = Some(match policy.attachment {
            Attachment::Platform => AuthenticatorAttachment::Platform,
            Attachment::CrossPlatform => AuthenticatorAttachment::CrossPlatform,
        });
        selection.require_resident_key = policy.resident_key_required;
        selection.user_verification = match policy.user_verification {
            UserVerification::Required => UserVerificationPolicy::Required,
            UserVerification::Preferred => UserVerificationPolicy::Preferred,
        };
    }
}
