//! Verification outcomes.

use std::fmt;
use std::sync::Arc;

use ddcc_trust::TrustedEntity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::CanonicalDocument;

/// Terminal outcome of one decode attempt.
///
/// Variants are ordered by the pipeline stage that produces them; `Ord`
/// follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// No QR code was found in the input.
    NotFound,
    /// The payload matches none of the known formats.
    NotSupported,
    /// Outer text encoding could not be decoded.
    InvalidEncoding,
    /// Decoded bytes could not be decompressed.
    InvalidCompression,
    /// Signing envelope or payload is malformed.
    InvalidSigningFormat,
    /// No usable key identifier in the envelope.
    KidNotIncluded,
    /// Key identifier is unknown to the trust registry.
    IssuerNotTrusted,
    TerminatedKeys,
    ExpiredKeys,
    RevokedKeys,
    InvalidSignature,
    Verified,
}

impl Status {
    pub fn is_verified(self) -> bool {
        self == Self::Verified
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::InvalidEncoding => "INVALID_ENCODING",
            Self::InvalidCompression => "INVALID_COMPRESSION",
            Self::InvalidSigningFormat => "INVALID_SIGNING_FORMAT",
            Self::KidNotIncluded => "KID_NOT_INCLUDED",
            Self::IssuerNotTrusted => "ISSUER_NOT_TRUSTED",
            Self::TerminatedKeys => "TERMINATED_KEYS",
            Self::ExpiredKeys => "EXPIRED_KEYS",
            Self::RevokedKeys => "REVOKED_KEYS",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Verified => "VERIFIED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of decoding and verifying one QR payload.
///
/// A `Verified` result always carries both `contents` and `issuer`; the
/// constructors make any other combination unrepresentable.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    status: Status,
    contents: Option<CanonicalDocument>,
    issuer: Option<Arc<TrustedEntity>>,
    raw_qr: String,
    unpacked: Option<String>,
    country: Option<String>,
}

impl VerificationResult {
    pub fn verified(
        raw_qr: impl Into<String>,
        contents: CanonicalDocument,
        issuer: Arc<TrustedEntity>,
        unpacked: Option<String>,
        country: Option<String>,
    ) -> Self {
        Self {
            status: Status::Verified,
            contents: Some(contents),
            issuer: Some(issuer),
            raw_qr: raw_qr.into(),
            unpacked,
            country,
        }
    }

    /// A failed verification. `Status::Verified` is downgraded to
    /// `InvalidSignature` since there is nothing to show for it.
    pub fn rejected(
        status: Status,
        raw_qr: impl Into<String>,
        unpacked: Option<String>,
        country: Option<String>,
    ) -> Self {
        let status = if status.is_verified() {
            Status::InvalidSignature
        } else {
            status
        };
        Self {
            status,
            contents: None,
            issuer: None,
            raw_qr: raw_qr.into(),
            unpacked,
            country,
        }
    }

    pub fn not_supported(raw_qr: impl Into<String>) -> Self {
        Self::rejected(Status::NotSupported, raw_qr, None, None)
    }

    pub fn not_found() -> Self {
        Self::rejected(Status::NotFound, String::new(), None, None)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_verified(&self) -> bool {
        self.status.is_verified()
    }

    pub fn contents(&self) -> Option<&CanonicalDocument> {
        self.contents.as_ref()
    }

    pub fn issuer(&self) -> Option<&Arc<TrustedEntity>> {
        self.issuer.as_ref()
    }

    pub fn raw_qr(&self) -> &str {
        &self.raw_qr
    }

    /// Decoded payload as JSON text, once the envelope could be parsed.
    pub fn unpacked(&self) -> Option<&str> {
        self.unpacked.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// The `Composition` resource of the canonical document.
    pub fn composition(&self) -> Option<&Value> {
        self.contents.as_ref().and_then(CanonicalDocument::composition)
    }

    pub fn into_contents(self) -> Option<CanonicalDocument> {
        self.contents
    }
}
