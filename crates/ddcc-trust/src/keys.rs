//! Key material decoding for verification methods.
//!
//! Trust lists publish keys in several encodings. The decoder tries them in a
//! fixed precedence order and the first applicable encoding wins:
//!
//! 1. `publicKeyJwk` (EC P-256, OKP Ed25519, RSA); symmetric JWKs fall through
//! 2. `publicKeyJwk.x5c[0]` when the JWK itself is malformed
//! 3. `publicKeyBase64` (SPKI, wrapped as PEM)
//! 4. `publicKeyBase58` (raw Ed25519)
//! 5. `publicKeyMultibase` (raw Ed25519)

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL};
use base64::Engine;
use pkcs8::DecodePublicKey;
use serde::Deserialize;
use serde_json::{Map, Value};
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

use crate::did::VerificationMethod;
use crate::error::KeyDecodeError;

/// Multicodec prefix for raw Ed25519 public keys.
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// A usable asymmetric public key.
#[derive(Debug, Clone, PartialEq)]
pub enum PublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    Rsa(rsa::RsaPublicKey),
}

impl PublicKey {
    /// Short name of the key shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ed25519(_) => "Ed25519",
            Self::P256(_) => "P-256",
            Self::P384(_) => "P-384",
            Self::Rsa(_) => "RSA",
        }
    }

    /// Decode a DER SubjectPublicKeyInfo.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, KeyDecodeError> {
        if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::P256(key));
        }
        if let Ok(key) = p384::ecdsa::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::P384(key));
        }
        if let Ok(key) = ed25519_dalek::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::Ed25519(key));
        }
        rsa::RsaPublicKey::from_public_key_der(der)
            .map(Self::Rsa)
            .map_err(|e| KeyDecodeError::UnsupportedKey {
                reason: format!("SPKI is not P-256, P-384, Ed25519 or RSA: {}", e),
            })
    }

    /// Decode a PEM `PUBLIC KEY` block.
    pub fn from_spki_pem(pem: &str) -> Result<Self, KeyDecodeError> {
        if let Ok(key) = p256::ecdsa::VerifyingKey::from_public_key_pem(pem) {
            return Ok(Self::P256(key));
        }
        if let Ok(key) = p384::ecdsa::VerifyingKey::from_public_key_pem(pem) {
            return Ok(Self::P384(key));
        }
        if let Ok(key) = ed25519_dalek::VerifyingKey::from_public_key_pem(pem) {
            return Ok(Self::Ed25519(key));
        }
        rsa::RsaPublicKey::from_public_key_pem(pem)
            .map(Self::Rsa)
            .map_err(|e| KeyDecodeError::UnsupportedKey {
                reason: format!("PEM is not P-256, P-384, Ed25519 or RSA: {}", e),
            })
    }

    /// Raw 32-byte Ed25519 key.
    pub fn ed25519_from_bytes(bytes: &[u8]) -> Result<Self, KeyDecodeError> {
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyDecodeError::UnsupportedKey {
                reason: format!("expected 32 Ed25519 key bytes, got {}", bytes.len()),
            })?;
        ed25519_dalek::VerifyingKey::from_bytes(&raw)
            .map(Self::Ed25519)
            .map_err(|e| KeyDecodeError::UnsupportedKey {
                reason: format!("invalid Ed25519 point: {}", e),
            })
    }

    /// Public key of a DER X.509 certificate.
    pub fn from_certificate_der(der: &[u8]) -> Result<Self, KeyDecodeError> {
        let cert = Certificate::from_der(der).map_err(|e| KeyDecodeError::InvalidCertificate {
            reason: e.to_string(),
        })?;
        let spki = cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| KeyDecodeError::InvalidCertificate {
                reason: e.to_string(),
            })?;
        Self::from_spki_der(&spki)
    }
}

/// Outcome of a single decode strategy.
type Attempt = Result<Option<PublicKey>, KeyDecodeError>;

type Strategy = fn(&VerificationMethod) -> Attempt;

/// Decodes verification methods into public keys.
#[derive(Debug, Clone)]
pub struct KeyMaterialDecoder {
    strategies: Vec<(&'static str, Strategy)>,
}

impl Default for KeyMaterialDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMaterialDecoder {
    pub fn new() -> Self {
        Self {
            strategies: vec![
                ("publicKeyJwk", decode_jwk as Strategy),
                ("publicKeyBase64", decode_base64),
                ("publicKeyBase58", decode_base58),
                ("publicKeyMultibase", decode_multibase),
            ],
        }
    }

    /// Decode, logging and swallowing failures.
    pub fn decode(&self, method: &VerificationMethod) -> Option<PublicKey> {
        match self.try_decode(method) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(kid = %method.id, error = %e, "unable to load key");
                None
            }
        }
    }

    /// Decode, reporting why the method could not be used.
    pub fn try_decode(&self, method: &VerificationMethod) -> Result<PublicKey, KeyDecodeError> {
        for (name, strategy) in &self.strategies {
            if let Some(key) = strategy(method)? {
                tracing::trace!(kid = %method.id, encoding = name, kind = key.kind(), "decoded key");
                return Ok(key);
            }
        }
        Err(KeyDecodeError::NoSupportedEncoding)
    }
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default)]
    crv: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

fn decode_jwk(method: &VerificationMethod) -> Attempt {
    let Some(jwk) = &method.public_key_jwk else {
        return Ok(None);
    };

    match parse_jwk(jwk) {
        Ok(key) => Ok(key),
        Err(e) => match first_certificate(jwk) {
            Some(cert_b64) => {
                let der = BASE64
                    .decode(strip_whitespace(cert_b64))
                    .map_err(|err| KeyDecodeError::InvalidCertificate {
                        reason: format!("invalid base64: {}", err),
                    })?;
                PublicKey::from_certificate_der(&der).map(Some)
            }
            None => Err(e),
        },
    }
}

/// `Ok(None)` for well-formed but symmetric keys.
fn parse_jwk(jwk: &Map<String, Value>) -> Attempt {
    let parsed: Jwk = serde_json::from_value(Value::Object(jwk.clone())).map_err(|e| {
        KeyDecodeError::InvalidJwk {
            reason: e.to_string(),
        }
    })?;

    let field = |value: &Option<String>, name: &str| -> Result<Vec<u8>, KeyDecodeError> {
        let text = value.as_deref().ok_or_else(|| KeyDecodeError::InvalidJwk {
            reason: format!("missing {}", name),
        })?;
        BASE64_URL
            .decode(text.trim_end_matches('='))
            .map_err(|e| KeyDecodeError::InvalidJwk {
                reason: format!("invalid {}: {}", name, e),
            })
    };

    match parsed.kty.as_str() {
        "EC" => {
            let mut sec1 = vec![0x04];
            sec1.extend(field(&parsed.x, "x")?);
            sec1.extend(field(&parsed.y, "y")?);
            fn invalid_point(e: impl std::fmt::Display) -> KeyDecodeError {
                KeyDecodeError::InvalidJwk {
                    reason: format!("invalid EC point: {}", e),
                }
            }
            match parsed.crv.as_deref().unwrap_or_default() {
                "P-256" => p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map(|key| Some(PublicKey::P256(key)))
                    .map_err(invalid_point),
                "P-384" => p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map(|key| Some(PublicKey::P384(key)))
                    .map_err(invalid_point),
                crv => Err(KeyDecodeError::InvalidJwk {
                    reason: format!("unsupported curve {:?}", crv),
                }),
            }
        }
        "OKP" => {
            let crv = parsed.crv.as_deref().unwrap_or_default();
            if crv != "Ed25519" {
                return Err(KeyDecodeError::InvalidJwk {
                    reason: format!("unsupported curve {:?}", crv),
                });
            }
            PublicKey::ed25519_from_bytes(&field(&parsed.x, "x")?).map(Some)
        }
        "RSA" => {
            let n = rsa::BigUint::from_bytes_be(&field(&parsed.n, "n")?);
            let e = rsa::BigUint::from_bytes_be(&field(&parsed.e, "e")?);
            rsa::RsaPublicKey::new(n, e)
                .map(|key| Some(PublicKey::Rsa(key)))
                .map_err(|e| KeyDecodeError::InvalidJwk {
                    reason: format!("invalid RSA key: {}", e),
                })
        }
        "oct" => Ok(None),
        other => Err(KeyDecodeError::InvalidJwk {
            reason: format!("unsupported kty {:?}", other),
        }),
    }
}

fn first_certificate(jwk: &Map<String, Value>) -> Option<&str> {
    jwk.get("x5c")?.as_array()?.first()?.as_str()
}

fn decode_base64(method: &VerificationMethod) -> Attempt {
    let Some(b64) = &method.public_key_base64 else {
        return Ok(None);
    };
    PublicKey::from_spki_pem(&wrap_pem(b64)).map(Some)
}

fn decode_base58(method: &VerificationMethod) -> Attempt {
    let Some(b58) = &method.public_key_base58 else {
        return Ok(None);
    };
    let bytes = bs58::decode(b58.trim())
        .into_vec()
        .map_err(|e| KeyDecodeError::InvalidEncoding {
            encoding: "base58",
            reason: e.to_string(),
        })?;
    PublicKey::ed25519_from_bytes(&bytes).map(Some)
}

fn decode_multibase(method: &VerificationMethod) -> Attempt {
    let Some(encoded) = &method.public_key_multibase else {
        return Ok(None);
    };
    let (_, bytes) =
        multibase::decode(encoded.trim()).map_err(|e| KeyDecodeError::InvalidEncoding {
            encoding: "multibase",
            reason: e.to_string(),
        })?;
    let raw = match bytes.strip_prefix(&ED25519_MULTICODEC) {
        Some(raw) if raw.len() == 32 => raw,
        _ => bytes.as_slice(),
    };
    PublicKey::ed25519_from_bytes(raw).map(Some)
}

/// Wrap bare base64 SPKI into a PEM block with 64-column lines.
fn wrap_pem(b64: &str) -> String {
    let body = strip_whitespace(b64);
    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    pem
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
