//! Core primitives for pdf-seal: document digests, SRI encoding, and the shared
//! verification result and upload limits.
//!
//! This crate has no key material, CLI or HTTP dependencies.

pub mod digest;
pub mod types;

pub use digest::{DIGEST_LEN, DigestAlgorithm, encode_sri, sha256_digest};
pub use types::*;
