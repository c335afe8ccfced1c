use clap::{Args, Parser, Subcommand, ValueEnum};
use pdf_seal_dsa::{DsaParameters, KeyStore, PRIVATE_KEY_ENV, PUBLIC_KEY_ENV};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pdf-seal",
    about = "Sign and verify PDFs with a service-held DSA key",
    long_about = "Sign and verify PDFs with a service-held DSA key, locally or over HTTP.\n\n\
                  The key pair is taken from PDF_SEAL_PUBLIC_KEY/PDF_SEAL_PRIVATE_KEY (PEM), \
                  else loaded from the key directory, else generated and saved there."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output machine-readable JSON to stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging (sets RUST_LOG=debug if not already set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "PDF_SEAL_LOG_JSON")]
    pub log_json: bool,

    #[command(flatten)]
    pub keys: KeyArgs,
}

#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Directory holding public.pem and private.pem
    #[arg(long, global = true, env = "PDF_SEAL_KEY_DIR", default_value = "keys")]
    pub key_dir: PathBuf,

    /// DSA parameter sizes used if a new key pair has to be generated
    #[arg(
        long,
        global = true,
        value_enum,
        env = "PDF_SEAL_KEY_SIZE",
        default_value = "dsa-2048-224"
    )]
    pub key_size: KeySize,
}

impl KeyArgs {
    /// Environment PEMs, then the key directory, then generation.
    pub fn key_store(&self) -> KeyStore {
        KeyStore::standard(
            std::env::var(PUBLIC_KEY_ENV).ok(),
            std::env::var(PRIVATE_KEY_ENV).ok(),
            &self.key_dir,
            self.key_size.into(),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP signing service (POST /sign, POST /verify)
    Serve {
        /// Address to listen on
        #[arg(long, env = "PDF_SEAL_BIND", default_value = "0.0.0.0")]
        bind: IpAddr,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 5000)]
        port: u16,

        /// Allowed CORS origin ("*" allows any)
        #[arg(long, env = "FRONTEND_URL", default_value = "*")]
        cors_origin: String,
    },

    /// Sign a PDF file and print the base64 signature
    Sign {
        /// Path to the PDF file to sign
        input: PathBuf,

        /// Write the signature to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a base64 signature against a PDF file
    Verify {
        /// Path to the PDF file
        input: PathBuf,

        /// Base64 signature text
        #[arg(
            short,
            long,
            conflicts_with = "signature_file",
            required_unless_present = "signature_file"
        )]
        signature: Option<String>,

        /// File containing the base64 signature
        #[arg(long)]
        signature_file: Option<PathBuf>,
    },

    /// Print the service public key (generating the key pair if needed)
    PublicKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeySize {
    /// 2048-bit modulus, 224-bit divisor
    #[value(name = "dsa-2048-224")]
    Dsa2048_224,
    /// 2048-bit modulus, 256-bit divisor
    #[value(name = "dsa-2048-256")]
    Dsa2048_256,
    /// 3072-bit modulus, 256-bit divisor
    #[value(name = "dsa-3072-256")]
    Dsa3072_256,
}

impl From<KeySize> for DsaParameters {
    fn from(size: KeySize) -> Self {
        match size {
            KeySize::Dsa2048_224 => DsaParameters::Dsa2048_224,
            KeySize::Dsa2048_256 => DsaParameters::Dsa2048_256,
            KeySize::Dsa3072_256 => DsaParameters::Dsa3072_256,
        }
    }
}
