//! DSA signing backend for pdf-seal: the service key store and the
//! sign/verify engine built on it.
//!
//! The algorithm is DSA over SHA-256 for compatibility with existing keys and
//! signatures. DSA signing is only as strong as its per-signature nonce; see
//! [`DsaParameters`] for the supported parameter sets.

pub mod engine;
pub mod error;
pub mod keystore;
pub mod sign;
pub mod verify;

pub use engine::SignatureEngine;
pub use error::EngineError;
pub use keystore::{
    AlgorithmParameters, DsaParameters, KeyPair, KeySource, KeyStore, PRIVATE_KEY_ENV,
    PUBLIC_KEY_ENV,
};
pub use sign::sign_document;
pub use verify::verify_document;

#[cfg(test)]
pub(crate) mod test_support {
    //! Domain parameter generation dominates test time, so every test key
    //! shares one set of parameters.

    use crate::KeyPair;
    use dsa::{Components, KeySize, SigningKey};
    use rand::rngs::OsRng;
    use std::sync::LazyLock;

    static COMPONENTS: LazyLock<Components> =
        LazyLock::new(|| Components::generate(&mut OsRng, KeySize::DSA_2048_224));

    static KEY_PAIR: LazyLock<KeyPair> = LazyLock::new(fresh_key_pair);
    static OTHER_KEY_PAIR: LazyLock<KeyPair> = LazyLock::new(fresh_key_pair);

    pub fn fresh_key_pair() -> KeyPair {
        KeyPair::from_signing_key(SigningKey::generate(&mut OsRng, COMPONENTS.clone())).unwrap()
    }

    pub fn key_pair() -> &'static KeyPair {
        &KEY_PAIR
    }

    pub fn other_key_pair() -> &'static KeyPair {
        &OTHER_KEY_PAIR
    }
}
