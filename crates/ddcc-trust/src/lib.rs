//! Federated trust registry for health credential verifiers.
//!
//! This crate answers one question for a verifier: which public key, if any,
//! is trusted for a credential's key identifier? It provides:
//!
//! - did:web trust list fetching over HTTPS
//! - Key material decoding (JWK, x5c, base64 SPKI, base58, multibase)
//! - An atomically swapped registry snapshot with production and acceptance scopes
//! - Kid → key-id URI resolution shared by all credential formats
//!
//! # Quick Start
//!
//! ```no_run
//! use ddcc_trust::{Framework, TrustConfig, TrustRegistry, TrustResolver};
//!
//! # async fn example() -> ddcc_trust::TrustResult<()> {
//! let registry = TrustRegistry::did_web(TrustConfig::from_env())?;
//! let report = registry.init_default().await;
//! println!("loaded {} keys", report.loaded());
//!
//! if let Some(entity) = registry.resolve(Framework::Dcc, "XCL#Lzr6x4ZJ0Ro=") {
//!     println!("trusted: {:?}", entity.display_name("en"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `DDCC_TRUST_PRODUCTION_DID` | Production trust list (default: `did:web:tng-cdn-uat.who.int:trustlist`) |
//! | `DDCC_TRUST_ACCEPTANCE_DID` | Acceptance trust list (default: `did:web:tng-cdn-dev.who.int:trustlist`) |
//! | `DDCC_TRUST_FALLBACK_CONTROLLER` | Acceptance controller for bare kids (default: `xcl`, empty disables) |
//! | `DDCC_TRUST_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `DDCC_TRUST_ORIGIN` | Origin override for did:web fetches |

pub mod did;
pub mod error;
pub mod keys;
pub mod registry;
pub mod resolver;
pub mod types;

// Re-export main types
pub use did::{did_web_location, DidDocument, VerificationMethod};
pub use error::{KeyDecodeError, TrustError, TrustResult};
pub use keys::{KeyMaterialDecoder, PublicKey};
pub use registry::{
    LoadReport, SkippedMethod, SourceOutcome, SourceReport, TrustRegistry, TrustResolver,
    TrustSnapshot,
};
pub use resolver::{DidWebResolver, DocumentResolver, StaticDocumentResolver, TRUST_USER_AGENT};
pub use types::{EntityStatus, Framework, RegistryEntity, Scope, TrustConfig, TrustedEntity};
