//! Offline verification of digital health credential QR payloads.
//!
//! A [`QrDecoder`] recognises the payload format, then the matching
//! verifier decodes it, checks its signature against a trust registry and
//! maps the content into a [`CanonicalDocument`]. Supported formats:
//!
//! - HCERT (`HC1:`): EU Digital COVID Certificate and WHO DDCC:VS
//! - SMART Health Cards (`shc:/`)
//! - DIVOC credentials (`B64:` or a raw ZIP archive)
//! - ICAO VDS-NC seals
//!
//! Every call yields exactly one [`Status`]; nothing here panics or returns
//! an error for a bad credential.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ddcc_trust::{TrustConfig, TrustRegistry};
//! use ddcc_verify::{QrDecoder, Status};
//!
//! # async fn example(payload: &str) -> ddcc_trust::TrustResult<()> {
//! let registry = Arc::new(TrustRegistry::did_web(TrustConfig::from_env())?);
//! registry.init_default().await;
//!
//! let decoder = QrDecoder::new(registry);
//! let result = decoder.decode(payload);
//! if result.status() == Status::Verified {
//!     println!("{}", result.contents().map(|c| c.to_json()).unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod cose;
pub mod decoder;
pub mod document;
pub mod jws;
pub mod mapper;
pub mod signature;
pub mod status;
pub mod verifier;

pub use decoder::QrDecoder;
pub use document::{BundleEntry, CanonicalDocument, DocumentMapper, LogicalModel, MapError};
pub use mapper::DdccMapper;
pub use signature::{SignatureAlgorithm, SignatureError};
pub use status::{Status, VerificationResult};
pub use verifier::{
    CredentialFormat, DivocVerifier, FormatVerifier, HcertVerifier, IcaoVerifier, ShcVerifier,
    VerifierContext,
};
