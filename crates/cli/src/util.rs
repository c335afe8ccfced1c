//! CLI utility functions.

use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_seal_core::{MAX_DOCUMENT_SIZE, within_document_limit};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

pub fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const KB_TO_MB_ROUNDING_THRESHOLD: usize = 1_048_525;

    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < KB_TO_MB_ROUNDING_THRESHOLD {
        format!("{:.1} KB", bytes as f64 / KB)
    } else {
        format!("{:.2} MB", bytes as f64 / MB)
    }
}

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.into());
    spinner
}

/// Read a PDF from disk, enforcing the same size limit as the HTTP service.
pub fn read_document(path: &Path) -> Result<Vec<u8>> {
    let spinner = spinner(format!("Reading PDF {}", style(path.display()).cyan()));

    let file = File::open(path).with_context(|| format!("Failed to open PDF: {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat PDF: {}", path.display()))?
        .len();
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    if !within_document_limit(len) {
        spinner.finish_and_clear();
        bail!(
            "File too large ({}). Maximum size is {}.",
            format_bytes(len),
            format_bytes(MAX_DOCUMENT_SIZE)
        );
    }

    let mut data = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut data)
        .with_context(|| format!("Failed to read PDF: {}", path.display()))?;

    spinner.finish_with_message(format!(
        "[OK] Read PDF ({})",
        style(format_bytes(data.len())).cyan()
    ));
    Ok(data)
}
