//! Canonical clinical document and the mapper seam.
//!
//! A verified credential is handed to a [`DocumentMapper`] as a
//! [`LogicalModel`] (the decoded payload tagged with its format) and comes
//! back as a FHIR-shaped document `Bundle` whose first entry is a
//! `Composition`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::verifier::CredentialFormat;

/// One `Bundle.entry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: String,
    pub resource: Value,
}

/// A document `Bundle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDocument {
    resource_type: String,

    #[serde(rename = "type")]
    bundle_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default)]
    entry: Vec<BundleEntry>,
}

impl CanonicalDocument {
    /// Document with `composition` as its first entry.
    pub fn new(composition_url: impl Into<String>, composition: Value) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            bundle_type: "document".to_string(),
            timestamp: None,
            entry: vec![BundleEntry {
                full_url: composition_url.into(),
                resource: composition,
            }],
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn push(&mut self, full_url: impl Into<String>, resource: Value) {
        self.entry.push(BundleEntry {
            full_url: full_url.into(),
            resource,
        });
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entry
    }

    pub fn composition(&self) -> Option<&Value> {
        self.resources("Composition").next()
    }

    /// Resources of one `resourceType`, in entry order.
    pub fn resources<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.entry
            .iter()
            .map(|e| &e.resource)
            .filter(move |r| r.get("resourceType").and_then(Value::as_str) == Some(resource_type))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Decoded credential payload awaiting mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalModel {
    pub format: CredentialFormat,
    pub payload: Value,
}

impl LogicalModel {
    pub fn new(format: CredentialFormat, payload: Value) -> Self {
        Self { format, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("payload has no {0}")]
    Missing(&'static str),

    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

/// Structural transform from a logical model to the canonical document.
pub trait DocumentMapper: Send + Sync {
    fn map(&self, model: &LogicalModel) -> Result<CanonicalDocument, MapError>;
}
