//! Local sign command.

use anyhow::{Context, Result};
use console::style;
use pdf_seal_core::{DigestAlgorithm, encode_sri, sha256_digest};
use std::path::{Path, PathBuf};

use crate::cli::KeyArgs;
use crate::commands::load_engine;
use crate::json::SignJson;
use crate::util::{format_bytes, read_document, spinner};

fn write_signature(path: &Path, signature: &str) -> Result<()> {
    std::fs::write(path, format!("{signature}\n"))
        .with_context(|| format!("Failed to write signature file: {}", path.display()))
}

pub fn sign_pdf(input: PathBuf, output: Option<PathBuf>, keys: &KeyArgs, json: bool) -> Result<()> {
    eprintln!("{}", style("==> Signing PDF with the service DSA key").cyan().bold());

    let pdf_data = read_document(&input)?;
    let engine = load_engine(keys)?;

    let spinner = spinner("Creating signature...");
    let signature = engine.sign(&pdf_data).context("Failed to sign PDF")?;
    spinner.finish_with_message(format!(
        "[OK] Created signature ({})",
        style(format_bytes(signature.len())).cyan()
    ));

    if let Some(path) = &output {
        write_signature(path, &signature)?;
    }

    eprintln!(
        "\n{} {}",
        style("[SUCCESS]").green().bold(),
        style("Signed successfully").cyan()
    );

    if json {
        let payload = SignJson {
            status: "ok",
            command: "sign",
            input: input.display().to_string(),
            output: output.as_ref().map(|p| p.display().to_string()),
            signature,
            key_fingerprint: engine.key_pair().fingerprint().to_string(),
            digest_sri: encode_sri(DigestAlgorithm::Sha256, &sha256_digest(&pdf_data)),
        };
        println!("{}", serde_json::to_string(&payload)?);
    } else if let Some(path) = &output {
        println!("{}", path.display());
    } else {
        println!("{signature}");
    }

    Ok(())
}
