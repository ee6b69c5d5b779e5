//! Signature algorithms and verification against registry keys.

use std::fmt;

use ddcc_trust::PublicKey;
use ed25519_dalek::Verifier as _;
use sha2::Sha256;

/// Signature algorithms accepted by the verifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// ECDSA P-256 with SHA-256, raw `r || s` signatures.
    Es256,
    /// ECDSA P-384 with SHA-384, raw `r || s` signatures.
    Es384,
    EdDsa,
    /// RSASSA-PSS with SHA-256.
    Ps256,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("{algorithm} cannot be verified with a {key} key")]
    KeyMismatch {
        algorithm: SignatureAlgorithm,
        key: &'static str,
    },

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("signature mismatch")]
    Mismatch,
}

impl SignatureAlgorithm {
    /// From a COSE algorithm identifier (RFC 9053).
    pub fn from_cose(id: i64) -> Result<Self, SignatureError> {
        match id {
            -7 => Ok(Self::Es256),
            -35 => Ok(Self::Es384),
            -8 => Ok(Self::EdDsa),
            -37 => Ok(Self::Ps256),
            -257 => Ok(Self::Rs256),
            other => Err(SignatureError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// From a JOSE `alg` name (RFC 7518).
    pub fn from_jose(name: &str) -> Result<Self, SignatureError> {
        match name {
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "EdDSA" => Ok(Self::EdDsa),
            "PS256" => Ok(Self::Ps256),
            "RS256" => Ok(Self::Rs256),
            other => Err(SignatureError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn cose_id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Es384 => -35,
            Self::EdDsa => -8,
            Self::Ps256 => -37,
            Self::Rs256 => -257,
        }
    }

    pub fn jose_name(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::EdDsa => "EdDSA",
            Self::Ps256 => "PS256",
            Self::Rs256 => "RS256",
        }
    }

    /// Verify `signature` over `message`.
    ///
    /// Fails closed: any key shape the algorithm cannot use is an error.
    pub fn verify(
        self,
        key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), SignatureError> {
        match (self, key) {
            (Self::Es256, PublicKey::P256(key)) => {
                let signature = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|e| SignatureError::Malformed(e.to_string()))?;
                key.verify(message, &signature)
                    .map_err(|_| SignatureError::Mismatch)
            }
            (Self::Es384, PublicKey::P384(key)) => {
                let signature = p384::ecdsa::Signature::from_slice(signature)
                    .map_err(|e| SignatureError::Malformed(e.to_string()))?;
                key.verify(message, &signature)
                    .map_err(|_| SignatureError::Mismatch)
            }
            (Self::EdDsa, PublicKey::Ed25519(key)) => {
                let signature = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|e| SignatureError::Malformed(e.to_string()))?;
                key.verify(message, &signature)
                    .map_err(|_| SignatureError::Mismatch)
            }
            (Self::Rs256, PublicKey::Rsa(key)) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
                let signature = rsa::pkcs1v15::Signature::try_from(signature)
                    .map_err(|e| SignatureError::Malformed(e.to_string()))?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(|_| SignatureError::Mismatch)
            }
            (Self::Ps256, PublicKey::Rsa(key)) => {
                let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(key.clone());
                let signature = rsa::pss::Signature::try_from(signature)
                    .map_err(|e| SignatureError::Malformed(e.to_string()))?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(|_| SignatureError::Mismatch)
            }
            (algorithm, key) => Err(SignatureError::KeyMismatch {
                algorithm,
                key: key.kind(),
            }),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jose_name())
    }
}
