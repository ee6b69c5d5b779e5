//! Trust registry data model and configuration.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;

/// Credential ecosystems a key lookup is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    /// DIVOC (India and others).
    Divoc,
    /// SMART Health Cards.
    Shc,
    /// EU Digital COVID Certificate / WHO DDCC:VS HCERT.
    Dcc,
    /// ICAO Visible Digital Seal for non-constrained environments.
    Icao,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Divoc => "DIVOC",
            Self::Shc => "SHC",
            Self::Dcc => "DCC",
            Self::Icao => "ICAO",
        };
        f.write_str(name)
    }
}

/// Partition of the trust registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Production,
    AcceptanceTest,
}

/// Lifecycle state of a trusted entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Current,
    Terminated,
    Revoked,
}

/// A signer the registry vouches for.
#[derive(Debug, Clone)]
pub struct TrustedEntity {
    /// Display names keyed by language tag.
    pub display_names: BTreeMap<String, String>,

    /// Free-form note from the trust source.
    pub note: String,

    pub status: EntityStatus,

    pub scope: Scope,

    /// Start of the validity window, if the source states one.
    pub valid_from: Option<DateTime<Utc>>,

    /// End of the validity window, if the source states one.
    pub valid_to: Option<DateTime<Utc>>,

    pub public_key: PublicKey,
}

impl TrustedEntity {
    /// Entity in `Current` status with a single English display name.
    pub fn new(name: impl Into<String>, scope: Scope, public_key: PublicKey) -> Self {
        let mut display_names = BTreeMap::new();
        display_names.insert("en".to_string(), name.into());
        Self {
            display_names,
            note: String::new(),
            status: EntityStatus::Current,
            scope,
            valid_from: None,
            valid_to: None,
            public_key,
        }
    }

    pub fn with_status(mut self, status: EntityStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Display name for a language, falling back to English then any name.
    pub fn display_name(&self, lang: &str) -> Option<&str> {
        self.display_names
            .get(lang)
            .or_else(|| self.display_names.get("en"))
            .or_else(|| self.display_names.values().next())
            .map(String::as_str)
    }

    /// Whether `valid_to` lies in the past relative to `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_to.is_some_and(|valid_to| valid_to < now)
    }
}

/// Where to fetch a trust source and the scope its entries are filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntity {
    pub scope: Scope,

    /// DID or URL of the trust document.
    pub resolvable_uri: String,

    /// Opaque, source-specific settings.
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

impl RegistryEntity {
    pub fn new(scope: Scope, resolvable_uri: impl Into<String>) -> Self {
        Self {
            scope,
            resolvable_uri: resolvable_uri.into(),
            extra: None,
        }
    }
}

/// Trust registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Production trust list DID; also the production key-id prefix.
    #[serde(default = "default_production_did")]
    pub production_did: String,

    /// Acceptance trust list DID; also the acceptance key-id prefix.
    #[serde(default = "default_acceptance_did")]
    pub acceptance_did: String,

    /// Controller tried in acceptance scope for kids without a `#`.
    #[serde(default = "default_fallback_controller")]
    pub bare_kid_fallback_controller: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Replaces `https://{host}` of did:web locations (mirrors, tests).
    #[serde(default)]
    pub origin_override: Option<String>,
}

// The "production" list published today is the WHO UAT gateway.
fn default_production_did() -> String {
    "did:web:tng-cdn-uat.who.int:trustlist".to_string()
}

fn default_acceptance_did() -> String {
    "did:web:tng-cdn-dev.who.int:trustlist".to_string()
}

fn default_fallback_controller() -> Option<String> {
    Some("xcl".to_string())
}

fn default_timeout() -> u64 {
    30
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            production_did: default_production_did(),
            acceptance_did: default_acceptance_did(),
            bare_kid_fallback_controller: default_fallback_controller(),
            timeout_secs: default_timeout(),
            origin_override: None,
        }
    }
}

impl TrustConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `DDCC_TRUST_PRODUCTION_DID` | Production trust list DID |
    /// | `DDCC_TRUST_ACCEPTANCE_DID` | Acceptance trust list DID |
    /// | `DDCC_TRUST_FALLBACK_CONTROLLER` | Bare-kid fallback controller (empty disables) |
    /// | `DDCC_TRUST_TIMEOUT` | Request timeout in seconds |
    /// | `DDCC_TRUST_ORIGIN` | Origin override for did:web fetches |
    pub fn from_env() -> Self {
        Self {
            production_did: std::env::var("DDCC_TRUST_PRODUCTION_DID")
                .unwrap_or_else(|_| default_production_did()),
            acceptance_did: std::env::var("DDCC_TRUST_ACCEPTANCE_DID")
                .unwrap_or_else(|_| default_acceptance_did()),
            bare_kid_fallback_controller: match std::env::var("DDCC_TRUST_FALLBACK_CONTROLLER") {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => default_fallback_controller(),
            },
            timeout_secs: std::env::var("DDCC_TRUST_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            origin_override: std::env::var("DDCC_TRUST_ORIGIN")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }

    /// The two registries loaded by default.
    pub fn default_registries(&self) -> Vec<RegistryEntity> {
        vec![
            RegistryEntity::new(Scope::Production, &self.production_did),
            RegistryEntity::new(Scope::AcceptanceTest, &self.acceptance_did),
        ]
    }

    pub fn with_production_did(mut self, did: impl Into<String>) -> Self {
        self.production_did = did.into();
        self
    }

    pub fn with_acceptance_did(mut self, did: impl Into<String>) -> Self {
        self.acceptance_did = did.into();
        self
    }

    pub fn with_fallback_controller(mut self, controller: Option<String>) -> Self {
        self.bare_kid_fallback_controller = controller;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_origin_override(mut self, origin: impl Into<String>) -> Self {
        self.origin_override = Some(origin.into());
        self
    }
}
