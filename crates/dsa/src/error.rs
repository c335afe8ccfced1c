//! Failure classes of the signature engine.

/// Errors returned by [`SignatureEngine`](crate::SignatureEngine).
///
/// A signature that simply does not match is not an error; it comes back as
/// `valid == false`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Verification was requested without any signature text.
    #[error("No signature provided.")]
    MissingSignature,

    /// The DSA primitive refused to produce a signature.
    #[error("Signing failed: {0}")]
    Signing(#[source] signature::Error),
}

impl EngineError {
    /// `true` for caller mistakes, `false` for internal failures.
    pub fn is_precondition(&self) -> bool {
        matches!(self, EngineError::MissingSignature)
    }
}
