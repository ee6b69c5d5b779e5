//! Format verifiers.
//!
//! Every verifier runs the same five stages, each of which can only fail
//! with its own status:
//!
//! 1. transport decode (`INVALID_ENCODING`, `INVALID_COMPRESSION`)
//! 2. envelope parse (`INVALID_SIGNING_FORMAT`)
//! 3. kid extraction (`KID_NOT_INCLUDED`)
//! 4. registry lookup and key status (`ISSUER_NOT_TRUSTED`, `TERMINATED_KEYS`,
//!    `REVOKED_KEYS`, `EXPIRED_KEYS`)
//! 5. signature check (`INVALID_SIGNATURE`), then mapping to `VERIFIED`
//!
//! Stages return `Result<_, Rejection>` and are chained with `?`, so the
//! first failing stage decides the outcome. No stage touches the network.

mod divoc;
mod hcert;
mod icao;
mod shc;

pub use divoc::DivocVerifier;
pub use hcert::{kid_to_text, HcertVerifier};
pub use icao::IcaoVerifier;
pub use shc::ShcVerifier;

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use ddcc_trust::{EntityStatus, Framework, TrustResolver, TrustedEntity};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{CanonicalDocument, DocumentMapper, LogicalModel};
use crate::mapper::DdccMapper;
use crate::signature::{SignatureAlgorithm, SignatureError};
use crate::status::{Status, VerificationResult};

/// Supported credential formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialFormat {
    /// EU DCC / WHO DDCC:VS HCERT (`HC1:`).
    Hcert,
    /// SMART Health Card (`shc:/`).
    Shc,
    /// DIVOC verifiable credential (`B64:` or a ZIP starting with `PK`).
    Divoc,
    /// ICAO VDS-NC.
    Icao,
}

impl CredentialFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hcert => "HCERT",
            Self::Shc => "SHC",
            Self::Divoc => "DIVOC",
            Self::Icao => "ICAO",
        }
    }

    /// Trust framework the format's keys are filed under.
    pub fn framework(self) -> Framework {
        match self {
            Self::Hcert => Framework::Dcc,
            Self::Shc => Framework::Shc,
            Self::Divoc => Framework::Divoc,
            Self::Icao => Framework::Icao,
        }
    }
}

impl fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common contract of the format verifiers.
pub trait FormatVerifier: Send + Sync {
    fn format(&self) -> CredentialFormat;

    /// Decode and verify one raw QR payload.
    fn unpack_and_verify(&self, raw: &str) -> VerificationResult;
}

/// Collaborators shared by all verifiers.
#[derive(Clone)]
pub struct VerifierContext {
    trust: Arc<dyn TrustResolver>,
    mapper: Arc<dyn DocumentMapper>,
}

impl fmt::Debug for VerifierContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierContext").finish_non_exhaustive()
    }
}

impl VerifierContext {
    /// Context using the default [`DdccMapper`].
    pub fn new(trust: Arc<dyn TrustResolver>) -> Self {
        Self {
            trust,
            mapper: Arc::new(DdccMapper::new()),
        }
    }

    pub fn with_mapper(mut self, mapper: Arc<dyn DocumentMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Stage 4: look up the signer and check its status.
    pub(crate) fn trusted_issuer(
        &self,
        framework: Framework,
        kid: &str,
    ) -> Result<Arc<TrustedEntity>, Rejection> {
        let entity = self.trust.resolve(framework, kid).ok_or_else(|| {
            Rejection::new(Status::IssuerNotTrusted, format!("kid {} is not trusted", kid))
        })?;

        match entity.status {
            EntityStatus::Terminated => {
                return Err(Rejection::new(Status::TerminatedKeys, format!("kid {}", kid)));
            }
            EntityStatus::Revoked => {
                return Err(Rejection::new(Status::RevokedKeys, format!("kid {}", kid)));
            }
            EntityStatus::Current => {}
        }
        if entity.is_expired_at(Utc::now()) {
            return Err(Rejection::new(Status::ExpiredKeys, format!("kid {}", kid)));
        }
        Ok(entity)
    }

    /// Final step after a valid signature.
    pub(crate) fn accept(
        &self,
        model: LogicalModel,
        issuer: Arc<TrustedEntity>,
    ) -> Result<Accepted, Rejection> {
        let contents = self
            .mapper
            .map(&model)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        Ok(Accepted { contents, issuer })
    }
}

/// Stage 5: check `signature` over `message` with the issuer's key.
pub(crate) fn verify_signature(
    algorithm: Result<SignatureAlgorithm, SignatureError>,
    issuer: &TrustedEntity,
    message: &[u8],
    signature: &[u8],
) -> Result<(), Rejection> {
    algorithm
        .and_then(|alg| alg.verify(&issuer.public_key, message, signature))
        .map_err(|e| Rejection::new(Status::InvalidSignature, e))
}

/// Why a pipeline stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rejection {
    pub(crate) status: Status,
    pub(crate) reason: String,
}

impl Rejection {
    pub(crate) fn new(status: Status, reason: impl fmt::Display) -> Self {
        Self {
            status,
            reason: reason.to_string(),
        }
    }
}

/// What a successful pipeline hands back.
pub(crate) struct Accepted {
    contents: CanonicalDocument,
    issuer: Arc<TrustedEntity>,
}

/// Diagnostics gathered while a pipeline runs.
#[derive(Debug, Default)]
pub(crate) struct Trace {
    pub(crate) unpacked: Option<String>,
    pub(crate) country: Option<String>,
}

/// Turn a pipeline outcome into the public result.
pub(crate) fn conclude(
    format: CredentialFormat,
    raw: &str,
    trace: Trace,
    outcome: Result<Accepted, Rejection>,
) -> VerificationResult {
    match outcome {
        Ok(Accepted { contents, issuer }) => {
            debug!(format = %format, country = ?trace.country, "credential verified");
            VerificationResult::verified(raw, contents, issuer, trace.unpacked, trace.country)
        }
        Err(rejection) => {
            debug!(
                format = %format,
                status = %rejection.status,
                reason = %rejection.reason,
                "credential rejected"
            );
            VerificationResult::rejected(rejection.status, raw, trace.unpacked, trace.country)
        }
    }
}
