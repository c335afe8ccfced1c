//! Process-wide signing service handed to request handlers.

use pdf_seal_core::VerificationResult;
use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;
use crate::keystore::KeyPair;

/// Cheap-to-clone handle pairing the immutable service key with the
/// sign/verify operations.
#[derive(Clone)]
pub struct SignatureEngine {
    key_pair: Arc<KeyPair>,
}

impl SignatureEngine {
    pub fn new(key_pair: KeyPair) -> Self {
        Self {
            key_pair: Arc::new(key_pair),
        }
    }

    /// Sign a document; returns base64 signature text.
    pub fn sign(&self, document: &[u8]) -> Result<String, EngineError> {
        crate::sign::sign_document(document, &self.key_pair)
    }

    /// Verify base64 signature text over a document.
    pub fn verify(
        &self,
        document: &[u8],
        signature_b64: &str,
    ) -> Result<VerificationResult, EngineError> {
        crate::verify::verify_document(document, signature_b64, &self.key_pair)
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }
}

impl fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("key_pair", &self.key_pair)
            .finish()
    }
}
