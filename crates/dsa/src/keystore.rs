//! Service key pair: resolution from the environment, the key directory, or
//! fresh generation.

use anyhow::{Context, Result, bail};
use dsa::{Components, KeySize, SigningKey, VerifyingKey};
use pdf_seal_core::{DigestAlgorithm, encode_sri, sha256_digest};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

pub const PUBLIC_KEY_ENV: &str = "PDF_SEAL_PUBLIC_KEY";
pub const PRIVATE_KEY_ENV: &str = "PDF_SEAL_PRIVATE_KEY";
pub const PUBLIC_KEY_FILE: &str = "public.pem";
pub const PRIVATE_KEY_FILE: &str = "private.pem";

/// DSA domain parameter sizes used when a new key pair is generated.
///
/// DSA is kept for compatibility with keys and signatures issued by earlier
/// deployments. A biased or repeated per-signature nonce leaks the private key,
/// so signing always draws nonces from the OS RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DsaParameters {
    /// 2048-bit modulus, 224-bit divisor.
    #[default]
    Dsa2048_224,
    /// 2048-bit modulus, 256-bit divisor.
    Dsa2048_256,
    /// 3072-bit modulus, 256-bit divisor.
    Dsa3072_256,
}

impl DsaParameters {
    pub fn name(&self) -> &'static str {
        match self {
            DsaParameters::Dsa2048_224 => "dsa-2048-224",
            DsaParameters::Dsa2048_256 => "dsa-2048-256",
            DsaParameters::Dsa3072_256 => "dsa-3072-256",
        }
    }

    pub fn algorithm_parameters(&self) -> AlgorithmParameters {
        let (modulus_length, divisor_length) = match self {
            DsaParameters::Dsa2048_224 => (2048, 224),
            DsaParameters::Dsa2048_256 => (2048, 256),
            DsaParameters::Dsa3072_256 => (3072, 256),
        };
        AlgorithmParameters {
            modulus_length,
            divisor_length,
        }
    }

    fn key_size(&self) -> KeySize {
        match self {
            DsaParameters::Dsa2048_224 => KeySize::DSA_2048_224,
            DsaParameters::Dsa2048_256 => KeySize::DSA_2048_256,
            DsaParameters::Dsa3072_256 => KeySize::DSA_3072_256,
        }
    }
}

/// Bit lengths of the DSA modulus `p` and divisor `q` of a key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmParameters {
    pub modulus_length: usize,
    pub divisor_length: usize,
}

/// The service's DSA key pair.
///
/// Built once at startup and shared read-only afterwards. The private half is
/// only reachable from inside this crate.
pub struct KeyPair {
    signing_key: SigningKey,
    public_key_pem: String,
    fingerprint: String,
    parameters: AlgorithmParameters,
}

impl KeyPair {
    /// Wrap a signing key, deriving the public PEM and fingerprint.
    pub fn from_signing_key(signing_key: SigningKey) -> Result<Self> {
        let verifying_key = signing_key.verifying_key();
        let public_der = verifying_key
            .to_public_key_der()
            .context("Failed to encode public key as SPKI DER")?;
        let public_key_pem = verifying_key
            .to_public_key_pem(LineEnding::LF)
            .context("Failed to encode public key as SPKI PEM")?;
        let fingerprint = encode_sri(
            DigestAlgorithm::Sha256,
            &sha256_digest(public_der.as_bytes()),
        );
        let components = verifying_key.components();
        let parameters = AlgorithmParameters {
            modulus_length: components.p().bits(),
            divisor_length: components.q().bits(),
        };

        Ok(Self {
            signing_key,
            public_key_pem,
            fingerprint,
            parameters,
        })
    }

    /// Parse an SPKI public key and a PKCS#8 private key, both PEM, and check
    /// that they belong together.
    pub fn from_pem(public_pem: &str, private_pem: &str) -> Result<Self> {
        let signing_key = SigningKey::from_pkcs8_pem(private_pem)
            .map_err(|e| anyhow::anyhow!("Invalid PKCS#8 private key: {}", e))?;
        let verifying_key = VerifyingKey::from_public_key_pem(public_pem)
            .map_err(|e| anyhow::anyhow!("Invalid SPKI public key: {}", e))?;

        let derived = signing_key
            .verifying_key()
            .to_public_key_der()
            .context("Failed to encode derived public key")?;
        let supplied = verifying_key
            .to_public_key_der()
            .context("Failed to encode supplied public key")?;
        if derived.as_bytes() != supplied.as_bytes() {
            bail!("Public key does not match private key");
        }

        Self::from_signing_key(signing_key)
    }

    /// Generate fresh domain parameters and a key pair.
    #[tracing::instrument(skip_all, fields(parameters = parameters.name()))]
    pub fn generate(parameters: DsaParameters) -> Result<Self> {
        tracing::debug!("Generating DSA domain parameters");
        let components = Components::generate(&mut OsRng, parameters.key_size());
        Self::from_signing_key(SigningKey::generate(&mut OsRng, components))
    }

    /// SPKI PEM of the public key.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// `sha256-<base64>` over the SPKI DER of the public key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn parameters(&self) -> AlgorithmParameters {
        self.parameters
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    fn private_key_pem(&self) -> Result<Zeroizing<String>> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("Failed to encode private key as PKCS#8 PEM: {}", e))
    }

    /// Write both halves into `dir`, refusing to replace existing files.
    fn persist(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create key directory: {}", dir.display()))?;

        let private_pem = self.private_key_pem()?;
        let private_path = dir.join(PRIVATE_KEY_FILE);
        write_new_file(&private_path, private_pem.as_bytes(), 0o600)?;

        // A private key without its public half blocks every later start.
        if let Err(e) = write_new_file(
            &dir.join(PUBLIC_KEY_FILE),
            self.public_key_pem.as_bytes(),
            0o644,
        ) {
            if let Err(cleanup) = std::fs::remove_file(&private_path) {
                tracing::warn!(
                    path = %private_path.display(),
                    error = %cleanup,
                    "Failed to remove private key after public key write failed"
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn write_new_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create key file: {}", path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write key file: {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to flush key file: {}", path.display()))?;
    Ok(())
}

/// PEM values from `.env` files often carry literal `\n` sequences.
fn normalize_pem(value: &str) -> String {
    value.trim().replace("\\n", "\n")
}

/// One place a key pair can come from. [`KeyStore`] tries them in order.
#[derive(Clone)]
pub enum KeySource {
    /// PEM strings supplied by the host (usually environment variables).
    Environment {
        public_pem: Option<String>,
        private_pem: Option<String>,
    },
    /// `public.pem` and `private.pem` in a directory.
    Directory(PathBuf),
    /// Generate a new pair and persist it into a directory.
    Generate {
        dir: PathBuf,
        parameters: DsaParameters,
    },
}

impl KeySource {
    pub fn name(&self) -> &'static str {
        match self {
            KeySource::Environment { .. } => "environment",
            KeySource::Directory(_) => "key directory",
            KeySource::Generate { .. } => "generator",
        }
    }

    /// `Ok(None)` means this source has nothing to offer and the next one
    /// should be tried. Errors are fatal.
    fn resolve(&self) -> Result<Option<KeyPair>> {
        match self {
            KeySource::Environment {
                public_pem,
                private_pem,
            } => {
                let public_pem = public_pem.as_deref().map(normalize_pem);
                let private_pem = private_pem.as_deref().map(normalize_pem);
                match (
                    public_pem.filter(|s| !s.is_empty()),
                    private_pem.filter(|s| !s.is_empty()),
                ) {
                    (None, None) => Ok(None),
                    (Some(public_pem), Some(private_pem)) => {
                        let private_pem = Zeroizing::new(private_pem);
                        KeyPair::from_pem(&public_pem, &private_pem)
                            .context("Key pair supplied via environment is invalid")
                            .map(Some)
                    }
                    (Some(_), None) => {
                        bail!("{} is set but {} is not", PUBLIC_KEY_ENV, PRIVATE_KEY_ENV)
                    }
                    (None, Some(_)) => {
                        bail!("{} is set but {} is not", PRIVATE_KEY_ENV, PUBLIC_KEY_ENV)
                    }
                }
            }
            KeySource::Directory(dir) => load_from_dir(dir),
            KeySource::Generate { dir, parameters } => {
                let pair = KeyPair::generate(*parameters)?;
                pair.persist(dir)?;
                tracing::info!(
                    dir = %dir.display(),
                    fingerprint = pair.fingerprint(),
                    "New DSA key pair generated and saved"
                );
                Ok(Some(pair))
            }
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Environment {
                public_pem,
                private_pem,
            } => f
                .debug_struct("Environment")
                .field("public_pem", &public_pem.is_some())
                .field("private_pem", &private_pem.is_some())
                .finish(),
            KeySource::Directory(dir) => f.debug_tuple("Directory").field(dir).finish(),
            KeySource::Generate { dir, parameters } => f
                .debug_struct("Generate")
                .field("dir", dir)
                .field("parameters", parameters)
                .finish(),
        }
    }
}

fn load_from_dir(dir: &Path) -> Result<Option<KeyPair>> {
    let public_path = dir.join(PUBLIC_KEY_FILE);
    let private_path = dir.join(PRIVATE_KEY_FILE);

    match (public_path.exists(), private_path.exists()) {
        (false, false) => Ok(None),
        (true, true) => {
            let public_pem = std::fs::read_to_string(&public_path)
                .with_context(|| format!("Failed to read {}", public_path.display()))?;
            let private_pem = Zeroizing::new(
                std::fs::read_to_string(&private_path)
                    .with_context(|| format!("Failed to read {}", private_path.display()))?,
            );
            let pair = KeyPair::from_pem(&public_pem, &private_pem)
                .with_context(|| format!("Key files in {} are invalid", dir.display()))?;
            tracing::info!(dir = %dir.display(), "Keys loaded from disk");
            Ok(Some(pair))
        }
        (true, false) => bail!(
            "{} exists but {} is missing; refusing to generate over an existing key",
            public_path.display(),
            private_path.display()
        ),
        (false, true) => bail!(
            "{} exists but {} is missing; refusing to generate over an existing key",
            private_path.display(),
            public_path.display()
        ),
    }
}

/// Ordered key sources; the first one that yields a key pair wins.
#[derive(Debug, Clone)]
pub struct KeyStore {
    sources: Vec<KeySource>,
}

impl KeyStore {
    pub fn new(sources: Vec<KeySource>) -> Self {
        Self { sources }
    }

    /// Environment PEMs, then `dir`, then generation into `dir`.
    pub fn standard(
        public_pem: Option<String>,
        private_pem: Option<String>,
        dir: impl Into<PathBuf>,
        parameters: DsaParameters,
    ) -> Self {
        let dir = dir.into();
        Self::new(vec![
            KeySource::Environment {
                public_pem,
                private_pem,
            },
            KeySource::Directory(dir.clone()),
            KeySource::Generate { dir, parameters },
        ])
    }

    /// Resolve the service key pair. Must complete before any request is served.
    #[tracing::instrument(skip(self), fields(sources = self.sources.len()))]
    pub fn initialize(&self) -> Result<KeyPair> {
        for source in &self.sources {
            let resolved = source
                .resolve()
                .with_context(|| format!("Failed to obtain key pair from {}", source.name()))?;
            if let Some(pair) = resolved {
                let parameters = pair.parameters();
                tracing::info!(
                    source = source.name(),
                    fingerprint = pair.fingerprint(),
                    modulus_length = parameters.modulus_length,
                    divisor_length = parameters.divisor_length,
                    "Key pair ready"
                );
                return Ok(pair);
            }
            tracing::debug!(source = source.name(), "Key source not configured");
        }
        bail!("No key source produced a key pair")
    }
}
