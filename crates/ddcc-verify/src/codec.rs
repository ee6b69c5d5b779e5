//! Transport codecs shared by the format verifiers.

use std::io::{Cursor, Read};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use flate2::read::{DeflateDecoder, ZlibDecoder};

/// Upper bound on decompressed credential payloads.
pub const MAX_INFLATED_BYTES: u64 = 1024 * 1024;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid base45: {0}")]
    Base45(String),

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("invalid numeric encoding: {0}")]
    Numeric(String),

    #[error("character {0:?} is outside Latin-1")]
    NotLatin1(char),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("archive error: {0}")]
    Archive(String),
}

/// Strip an ASCII prefix, ignoring case.
pub fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

/// Space is part of the Base45 alphabet, so only line breaks are trimmed.
pub fn base45_decode(text: &str) -> Result<Vec<u8>, CodecError> {
    base45::decode(text.trim_end_matches(['\r', '\n']))
        .map_err(|e| CodecError::Base45(e.to_string()))
}

/// Standard alphabet, padding required.
pub fn base64_decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| CodecError::Base64(e.to_string()))
}

/// URL-safe alphabet; trailing padding is tolerated.
pub fn base64url_decode(text: &str) -> Result<Vec<u8>, CodecError> {
    URL_SAFE_NO_PAD
        .decode(text.trim().trim_end_matches('='))
        .map_err(|e| CodecError::Base64(e.to_string()))
}

pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode the SMART Health Card numeric mode.
///
/// Every pair of digits `nn` stands for the character `nn + 45`.
pub fn numeric_decode(digits: &str) -> Result<String, CodecError> {
    let digits = digits.trim();
    if digits.len() % 2 != 0 {
        return Err(CodecError::Numeric(format!(
            "odd number of digits ({})",
            digits.len()
        )));
    }

    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks(2) {
        let (hi, lo) = (pair[0], pair[1]);
        if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
            return Err(CodecError::Numeric(format!(
                "non-digit in {:?}",
                String::from_utf8_lossy(pair)
            )));
        }
        let value = (hi - b'0') * 10 + (lo - b'0');
        if value > 77 {
            return Err(CodecError::Numeric(format!("value {} out of range", value)));
        }
        out.push(char::from(value + 45));
    }
    Ok(out)
}

/// Bytes of a string whose characters are all Latin-1 code points.
pub fn latin1_bytes(text: &str) -> Result<Vec<u8>, CodecError> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| CodecError::NotLatin1(c)))
        .collect()
}

/// Inflate a zlib stream, or pass the bytes through when they carry no zlib
/// header.
pub fn inflate_zlib_if_compressed(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    if bytes.first() != Some(&0x78) {
        return Ok(bytes.to_vec());
    }
    read_bounded(ZlibDecoder::new(bytes))
}

/// Inflate a raw DEFLATE stream (RFC 1951).
pub fn inflate_raw(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    read_bounded(DeflateDecoder::new(bytes))
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Read one named entry out of a ZIP archive.
pub fn zip_entry(bytes: &[u8], name: &str) -> Result<Vec<u8>, CodecError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| CodecError::Archive(e.to_string()))?;
    let entry = archive
        .by_name(name)
        .map_err(|e| CodecError::Archive(format!("{}: {}", name, e)))?;
    read_bounded(entry)
}

fn read_bounded(reader: impl Read) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    reader
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompress(e.to_string()))?;
    if out.len() as u64 > MAX_INFLATED_BYTES {
        return Err(CodecError::Decompress(format!(
            "payload exceeds {} bytes",
            MAX_INFLATED_BYTES
        )));
    }
    Ok(out)
}
