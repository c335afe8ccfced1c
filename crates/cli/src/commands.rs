//! Local verify and public-key commands.

use anyhow::{Context, Result, bail};
use console::style;
use pdf_seal_core::{DigestAlgorithm, encode_sri, sha256_digest};
use pdf_seal_dsa::{EngineError, SignatureEngine};
use std::path::{Path, PathBuf};

use crate::cli::KeyArgs;
use crate::json::{PublicKeyJson, VerifyJson};
use crate::util::{read_document, spinner};

/// Resolve the service key pair and wrap it in an engine.
pub fn load_engine(keys: &KeyArgs) -> Result<SignatureEngine> {
    let key_pair = keys
        .key_store()
        .initialize()
        .context("Failed to initialize the service key pair")?;
    eprintln!("    Using key: {}", style(key_pair.fingerprint()).cyan());
    Ok(SignatureEngine::new(key_pair))
}

fn read_signature_file(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read signature file: {}", path.display()))?;
    Ok(text.trim().to_string())
}

pub fn verify_pdf(
    input: PathBuf,
    signature: Option<String>,
    signature_file: Option<PathBuf>,
    keys: &KeyArgs,
    json: bool,
) -> Result<()> {
    eprintln!("{}", style("==> Verifying PDF signature").cyan().bold());

    let signature = match (signature, signature_file) {
        (Some(sig), _) => sig,
        (None, Some(path)) => read_signature_file(&path)?,
        (None, None) => bail!(EngineError::MissingSignature),
    };

    let pdf_data = read_document(&input)?;
    let engine = load_engine(keys)?;

    let spinner = spinner("Checking signature...");
    let result = engine.verify(&pdf_data, &signature);
    spinner.finish_and_clear();
    let result = result?;

    if !result.valid {
        bail!(
            "Signature does not match {} under key {}",
            input.display(),
            engine.key_pair().fingerprint()
        );
    }

    eprintln!(
        "\n{} {}",
        style("[VALID]").green().bold(),
        style("Signature verified").green()
    );

    if json {
        let payload = VerifyJson {
            status: "ok",
            command: "verify",
            input: input.display().to_string(),
            valid: result.valid,
            key_fingerprint: engine.key_pair().fingerprint().to_string(),
            digest_sri: encode_sri(DigestAlgorithm::Sha256, &sha256_digest(&pdf_data)),
        };
        println!("{}", serde_json::to_string(&payload)?);
    }

    Ok(())
}

pub fn print_public_key(keys: &KeyArgs, json: bool) -> Result<()> {
    let engine = load_engine(keys)?;
    let key_pair = engine.key_pair();
    let parameters = key_pair.parameters();

    if json {
        let payload = PublicKeyJson {
            status: "ok",
            command: "public-key",
            public_key_pem: key_pair.public_key_pem().to_string(),
            key_fingerprint: key_pair.fingerprint().to_string(),
            modulus_length: parameters.modulus_length,
            divisor_length: parameters.divisor_length,
        };
        println!("{}", serde_json::to_string(&payload)?);
    } else {
        eprintln!(
            "    Parameters: {}",
            style(format!(
                "DSA {}/{}",
                parameters.modulus_length, parameters.divisor_length
            ))
            .dim()
        );
        print!("{}", key_pair.public_key_pem());
    }

    Ok(())
}
