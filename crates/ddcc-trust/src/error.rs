//! Error types for the trust registry.

/// Trust registry errors.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// Trust source not found at the resolved location.
    #[error("trust source not found: {uri}")]
    NotFound { uri: String },

    /// URI is neither a did:web DID nor an http(s) URL.
    #[error("unsupported trust source uri: {uri}")]
    UnsupportedUri { uri: String },

    /// Trust document could not be parsed.
    #[error("invalid trust document from {uri}: {message}")]
    InvalidDocument { uri: String, message: String },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl TrustError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 1,
            Self::UnsupportedUri { .. } => 2,
            Self::Config { .. } => 2,
            Self::InvalidDocument { .. } => 3,
            Self::Network { .. } => 5,
        }
    }
}

impl From<reqwest::Error> for TrustError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for trust operations.
pub type TrustResult<T> = Result<T, TrustError>;

/// Reasons a verification method's key material could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyDecodeError {
    /// JWK present but malformed, with no certificate chain to fall back to.
    #[error("invalid publicKeyJwk: {reason}")]
    InvalidJwk { reason: String },

    /// Certificate from `x5c` could not be parsed.
    #[error("invalid x5c certificate: {reason}")]
    InvalidCertificate { reason: String },

    /// SubjectPublicKeyInfo did not contain a supported key.
    #[error("unsupported public key: {reason}")]
    UnsupportedKey { reason: String },

    /// Text encoding of the key was invalid.
    #[error("invalid {encoding} key encoding: {reason}")]
    InvalidEncoding {
        encoding: &'static str,
        reason: String,
    },

    /// None of the known key encodings is present.
    #[error("no supported key encoding on verification method")]
    NoSupportedEncoding,
}
