//! Common types and limits shared by the engine and its front ends.

use serde::{Deserialize, Serialize};

/// Largest document accepted for signing or verification (5 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 5 * 1024 * 1024;

/// Outcome of checking a signature against a document and the service key.
///
/// A negative outcome is not an error: `valid == false` covers a changed
/// document, a tampered or undecodable signature, and a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
}

impl VerificationResult {
    pub const VALID: Self = Self { valid: true };
    pub const INVALID: Self = Self { valid: false };
}

impl From<bool> for VerificationResult {
    fn from(valid: bool) -> Self {
        Self { valid }
    }
}

/// Returns `true` when `len` fits within [`MAX_DOCUMENT_SIZE`].
pub fn within_document_limit(len: usize) -> bool {
    len <= MAX_DOCUMENT_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_inclusive() {
        assert!(within_document_limit(0));
        assert!(within_document_limit(MAX_DOCUMENT_SIZE));
        assert!(!within_document_limit(MAX_DOCUMENT_SIZE + 1));
    }

    #[test]
    fn result_from_bool() {
        assert_eq!(VerificationResult::from(true), VerificationResult::VALID);
        assert_eq!(VerificationResult::from(false), VerificationResult::INVALID);
    }
}
