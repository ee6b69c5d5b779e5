//! Compact JWS envelopes (RFC 7515), including detached and unencoded
//! payloads (RFC 7797).

use serde::Deserialize;

use crate::codec::{base64url_decode, base64url_encode, CodecError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwsError {
    #[error("expected 3 segments, got {0}")]
    Segments(usize),

    #[error("invalid JWS header: {0}")]
    Header(String),

    #[error(transparent)]
    Encoding(#[from] CodecError),
}

/// Protected header fields used by verifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JwsHeader {
    #[serde(default)]
    pub alg: Option<String>,

    #[serde(default)]
    pub kid: Option<String>,

    /// `DEF` for raw DEFLATE compressed payloads.
    #[serde(default)]
    pub zip: Option<String>,

    /// `false` when the payload is signed unencoded.
    #[serde(default)]
    pub b64: Option<bool>,
}

/// A compact JWS split into its segments.
#[derive(Debug, Clone)]
pub struct CompactJws<'a> {
    pub header_b64: &'a str,
    pub payload_b64: &'a str,
    pub signature_b64: &'a str,
    pub header: JwsHeader,
}

impl<'a> CompactJws<'a> {
    /// Split and decode the header. The signature segment is left as text.
    pub fn parse(token: &'a str) -> Result<Self, JwsError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments[..] else {
            return Err(JwsError::Segments(segments.len()));
        };

        let header_bytes =
            base64url_decode(header_b64).map_err(|e| JwsError::Header(e.to_string()))?;
        let header: JwsHeader =
            serde_json::from_slice(&header_bytes).map_err(|e| JwsError::Header(e.to_string()))?;

        Ok(Self {
            header_b64,
            payload_b64,
            signature_b64,
            header,
        })
    }

    pub fn is_detached(&self) -> bool {
        self.payload_b64.is_empty()
    }

    pub fn is_compressed(&self) -> bool {
        self.header.zip.as_deref() == Some("DEF")
    }

    pub fn payload(&self) -> Result<Vec<u8>, JwsError> {
        Ok(base64url_decode(self.payload_b64)?)
    }

    pub fn signature(&self) -> Result<Vec<u8>, JwsError> {
        Ok(base64url_decode(self.signature_b64)?)
    }

    /// `ASCII(header) || '.' || ASCII(payload)`.
    pub fn signing_input(&self) -> Vec<u8> {
        format!("{}.{}", self.header_b64, self.payload_b64).into_bytes()
    }

    /// Signing input for a detached payload supplied by the caller.
    pub fn detached_signing_input(&self, payload: &[u8]) -> Vec<u8> {
        let mut input = Vec::with_capacity(self.header_b64.len() + 1 + payload.len() * 4 / 3 + 4);
        input.extend_from_slice(self.header_b64.as_bytes());
        input.push(b'.');
        if self.header.b64 == Some(false) {
            input.extend_from_slice(payload);
        } else {
            input.extend_from_slice(base64url_encode(payload).as_bytes());
        }
        input
    }
}
