//! DSA signing over document digests.

use base64::Engine;
use pdf_seal_core::sha256_digest;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use signature::{RandomizedDigestSigner, SignatureEncoding};

use crate::error::EngineError;
use crate::keystore::KeyPair;

/// The message handed to the DSA primitive.
///
/// The 32-byte document digest is itself the signed message, hashed once more
/// with SHA-256 by the signature scheme. Signatures issued by earlier
/// deployments were produced this way, so verification must match it.
pub(crate) fn message_digest(document: &[u8]) -> Sha256 {
    Sha256::new_with_prefix(sha256_digest(document))
}

/// Sign `document` with the service key, returning base64 of the DER signature.
///
/// Each call draws a fresh nonce, so repeated calls over the same document
/// return different strings that all verify.
#[tracing::instrument(skip_all, fields(data_len = document.len()))]
pub fn sign_document(document: &[u8], key_pair: &KeyPair) -> Result<String, EngineError> {
    let signature: dsa::Signature = key_pair
        .signing_key()
        .try_sign_digest_with_rng(&mut OsRng, message_digest(document))
        .map_err(EngineError::Signing)?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(signature.to_vec());
    tracing::debug!(sig_len = encoded.len(), "Signature created");
    Ok(encoded)
}
