//! DSA verification over document digests.

use base64::Engine;
use pdf_seal_core::VerificationResult;
use signature::DigestVerifier;

use crate::error::EngineError;
use crate::keystore::KeyPair;
use crate::sign::message_digest;

/// Decode base64 DER signature text. `None` when it is not a DSA signature.
fn decode_signature(signature_b64: &str) -> Option<dsa::Signature> {
    let der = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .ok()?;
    dsa::Signature::try_from(der.as_slice()).ok()
}

/// Check `signature_b64` against `document` and the service public key.
///
/// Only an empty signature is an error. Anything that cannot be decoded, or
/// decodes but does not match, is reported as `valid == false`.
#[tracing::instrument(skip_all, fields(data_len = document.len(), sig_len = signature_b64.len()))]
pub fn verify_document(
    document: &[u8],
    signature_b64: &str,
    key_pair: &KeyPair,
) -> Result<VerificationResult, EngineError> {
    let signature_b64 = signature_b64.trim();
    if signature_b64.is_empty() {
        return Err(EngineError::MissingSignature);
    }

    let Some(signature) = decode_signature(signature_b64) else {
        tracing::debug!("Signature is not base64-encoded DER");
        return Ok(VerificationResult::INVALID);
    };

    let valid = key_pair
        .verifying_key()
        .verify_digest(message_digest(document), &signature)
        .is_ok();
    tracing::debug!(valid, "Signature checked");
    Ok(VerificationResult::from(valid))
}
