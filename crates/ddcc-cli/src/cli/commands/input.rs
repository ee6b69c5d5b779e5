//! Reading QR payload text.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Payload from the argument, a file, or stdin (in that order).
///
/// Trailing line breaks are dropped; other whitespace is kept since it can
/// be part of the encoding. An empty payload yields `None`.
pub fn read_payload(payload: Option<&str>, file: Option<&Path>) -> Result<Option<String>> {
    let text = match (payload, file) {
        (Some(text), _) if text != "-" => text.to_string(),
        (_, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload file: {}", path.display()))?,
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read payload from stdin")?;
            buffer
        }
    };
    Ok(normalize(&text))
}

fn normalize(text: &str) -> Option<String> {
    let trimmed = text.trim_end_matches(['\r', '\n']);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
