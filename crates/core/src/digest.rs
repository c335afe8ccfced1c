//! Document digest (hash) with SRI-style encoding.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Length in bytes of a document digest.
pub const DIGEST_LEN: usize = 32;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DigestAlgorithm {
    Sha256 = 1,
}

impl DigestAlgorithm {
    /// Returns the algorithm name in lowercase (for SRI strings).
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

/// SHA-256 of a document.
///
/// Pure and infallible: any byte sequence, including an empty one, has a digest.
#[tracing::instrument(skip(data), fields(data_len = data.len()))]
pub fn sha256_digest(data: &[u8]) -> [u8; DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// Encode digest as SRI string (e.g., `sha256-<base64>`).
pub fn encode_sri(algorithm: DigestAlgorithm, digest: &[u8]) -> String {
    use base64::Engine;
    format!(
        "{}-{}",
        algorithm.name(),
        base64::engine::general_purpose::STANDARD.encode(digest)
    )
}
