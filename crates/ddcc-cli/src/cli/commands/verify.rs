//! `ddcc verify` - Decode a QR payload and verify it against the trust lists.

use anyhow::Result;
use ddcc_verify::{QrDecoder, VerificationResult};
use serde_json::{json, Value};
use tracing::info;

use super::input::read_payload;
use super::registry;
use crate::cli::args::VerifyArgs;
use crate::exit_codes::{REJECTED, VERIFIED};

pub async fn run(args: VerifyArgs) -> Result<i32> {
    let payload = read_payload(args.payload.as_deref(), args.file.as_deref())?;

    let (result, format) = match payload {
        // Nothing scanned: no need to touch the network.
        None => (VerificationResult::not_found(), None),
        Some(payload) => {
            let (registry, report) = registry::load(&args.registry).await?;
            if !report.is_complete() {
                info!(
                    failed = report.failed_sources().count(),
                    skipped = report.skipped().count(),
                    "trust registry loaded partially"
                );
            }
            let decoder = QrDecoder::new(registry);
            let format = decoder.detect(&payload);
            (decoder.decode(&payload), format.map(|f| f.as_str()))
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&result, format))?);
    } else if !args.quiet {
        print_summary(&result, format);
    }

    Ok(if result.is_verified() { VERIFIED } else { REJECTED })
}

fn to_json(result: &VerificationResult, format: Option<&str>) -> Value {
    let issuer = result.issuer().map(|entity| {
        json!({
            "name": entity.display_name("en"),
            "scope": entity.scope,
            "status": entity.status,
        })
    });
    // Keep the decoded payload structured when it is JSON.
    let unpacked = result.unpacked().map(|text| {
        serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string()))
    });

    json!({
        "status": result.status(),
        "format": format,
        "country": result.country(),
        "issuer": issuer,
        "contents": result.contents().map(|doc| doc.to_json()),
        "unpacked": unpacked,
    })
}

fn print_summary(result: &VerificationResult, format: Option<&str>) {
    println!("Status:  {}", result.status());
    if let Some(format) = format {
        println!("Format:  {format}");
    }
    if let Some(country) = result.country() {
        println!("Country: {country}");
    }
    if let Some(issuer) = result.issuer() {
        println!(
            "Issuer:  {} ({:?})",
            issuer.display_name("en").unwrap_or("unnamed"),
            issuer.scope
        );
    }
    if let Some(doc) = result.contents() {
        if let Some(name) = doc.resources("Patient").next().and_then(patient_name) {
            println!("Patient: {name}");
        }
        println!("Doses:   {}", doc.resources("Immunization").count());
    }
}

fn patient_name(patient: &Value) -> Option<String> {
    let name = patient.get("name")?.get(0)?;
    if let Some(text) = name.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let mut parts: Vec<&str> = name
        .get("given")
        .and_then(Value::as_array)
        .map(|given| given.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    parts.extend(name.get("family").and_then(Value::as_str));
    (!parts.is_empty()).then(|| parts.join(" "))
}
