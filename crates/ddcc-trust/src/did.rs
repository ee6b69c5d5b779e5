//! DID documents and did:web location rules.
//!
//! Trust lists are published as DID documents whose `verificationMethod`
//! array carries one entry per signer key. Only the fields the key decoder
//! needs are modelled; everything else in the document is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{TrustError, TrustResult};

/// A DID document as published by a trust list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DidDocument {
    /// Document DID.
    #[serde(default)]
    pub id: String,

    /// Raw verification method entries (objects or references).
    #[serde(default, rename = "verificationMethod")]
    pub verification_method: Vec<Value>,
}

/// One key entry of a DID document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Key identifier URI (`did:web:...:controller#fragment`).
    pub id: String,

    #[serde(default, rename = "type")]
    pub method_type: Option<String>,

    #[serde(default)]
    pub controller: Option<String>,

    #[serde(default)]
    pub public_key_jwk: Option<Map<String, Value>>,

    #[serde(default)]
    pub public_key_base64: Option<String>,

    #[serde(default)]
    pub public_key_base58: Option<String>,

    #[serde(default)]
    pub public_key_multibase: Option<String>,
}

impl DidDocument {
    /// Parse a document fetched from `uri`.
    pub fn from_slice(uri: &str, bytes: &[u8]) -> TrustResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| TrustError::InvalidDocument {
            uri: uri.to_string(),
            message: e.to_string(),
        })
    }

    /// Verification methods declared inline in the document.
    ///
    /// Reference strings and malformed entries are dropped. Relative ids
    /// (`#key-1`) are resolved against the document id.
    pub fn verification_methods(&self) -> Vec<VerificationMethod> {
        self.verification_method
            .iter()
            .filter(|entry| entry.is_object())
            .filter_map(|entry| {
                match serde_json::from_value::<VerificationMethod>(entry.clone()) {
                    Ok(mut method) => {
                        if method.id.starts_with('#') {
                            method.id = format!("{}{}", self.id, method.id);
                        }
                        Some(method)
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "ignoring malformed verification method");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Compute the HTTPS location of a did:web document.
///
/// ```text
/// did:web:example.com                 -> https://example.com/.well-known/did.json
/// did:web:example.com%3A8443:a:b      -> https://example.com:8443/a/b/did.json
/// ```
///
/// `origin_override` replaces the scheme and authority (mirrors, tests).
pub fn did_web_location(did: &str, origin_override: Option<&str>) -> TrustResult<Url> {
    let unsupported = || TrustError::UnsupportedUri {
        uri: did.to_string(),
    };

    let method_specific = did.strip_prefix("did:web:").ok_or_else(unsupported)?;
    let method_specific = method_specific.split('#').next().unwrap_or(method_specific);

    let mut parts = method_specific.split(':');
    let authority = parts
        .next()
        .filter(|a| !a.is_empty())
        .ok_or_else(unsupported)?
        .replace("%3A", ":")
        .replace("%3a", ":");
    let segments: Vec<&str> = parts.filter(|s| !s.is_empty()).collect();

    let path = if segments.is_empty() {
        "/.well-known/did.json".to_string()
    } else {
        format!("/{}/did.json", segments.join("/"))
    };

    let origin = match origin_override {
        Some(origin) => origin.trim_end_matches('/').to_string(),
        None => format!("https://{}", authority),
    };

    let base = Url::parse(&origin).map_err(|e| TrustError::Config {
        message: format!("invalid origin {}: {}", origin, e),
    })?;
    base.join(&path).map_err(|_| unsupported())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_web_location_with_path() {
        let url = did_web_location("did:web:tng-cdn-dev.who.int:trustlist", None).unwrap();
        assert_eq!(url.as_str(), "https://tng-cdn-dev.who.int/trustlist/did.json");
    }

    #[test]
    fn test_did_web_location_well_known() {
        let url = did_web_location("did:web:example.com", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/.well-known/did.json");
    }

    #[test]
    fn test_did_web_location_port() {
        let url = did_web_location("did:web:localhost%3A8443:a:b", None).unwrap();
        assert_eq!(url.as_str(), "https://localhost:8443/a/b/did.json");
    }

    #[test]
    fn test_did_web_location_origin_override() {
        let url = did_web_location(
            "did:web:tng-cdn-dev.who.int:trustlist",
            Some("http://127.0.0.1:9000/"),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/trustlist/did.json");
    }

    #[test]
    fn test_did_web_location_rejects_other_methods() {
        let result = did_web_location("did:key:z6Mk", None);
        assert!(matches!(result, Err(TrustError::UnsupportedUri { .. })));
    }

    #[test]
    fn test_verification_methods_filters_and_resolves() {
        let doc: DidDocument = serde_json::from_value(serde_json::json!({
            "id": "did:web:example.com:trustlist",
            "verificationMethod": [
                "did:web:example.com:trustlist#ref-only",
                { "id": "#key-1", "type": "JsonWebKey2020", "publicKeyBase58": "abc" },
                { "type": "missing-id" },
                { "id": "did:web:example.com:trustlist:xcl#k2", "publicKeyMultibase": "z123" }
            ]
        }))
        .unwrap();

        let methods = doc.verification_methods();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].id, "did:web:example.com:trustlist#key-1");
        assert_eq!(methods[0].public_key_base58.as_deref(), Some("abc"));
        assert_eq!(methods[1].id, "did:web:example.com:trustlist:xcl#k2");
    }

    #[test]
    fn test_from_slice_invalid() {
        let result = DidDocument::from_slice("did:web:x", b"not json");
        assert!(matches!(result, Err(TrustError::InvalidDocument { .. })));
    }
}
