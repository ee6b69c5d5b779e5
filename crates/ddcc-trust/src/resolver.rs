//! Trust document fetching.
//!
//! The registry never talks to the network directly; it asks a
//! [`DocumentResolver`] for the DID document behind a registry URI. Fetches
//! are single-attempt: a failure is final for that `init` pass.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use tracing::debug;

use crate::did::{did_web_location, DidDocument};
use crate::error::{TrustError, TrustResult};
use crate::types::TrustConfig;

/// User agent sent with trust document fetches.
pub const TRUST_USER_AGENT: &str = concat!("ddcc-trust/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a trust document body.
const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// Resolves a registry URI to its DID document.
#[async_trait]
pub trait DocumentResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> TrustResult<DidDocument>;
}

/// Fetches did:web documents (or plain http(s) URLs) over HTTPS.
#[derive(Debug, Clone)]
pub struct DidWebResolver {
    client: reqwest::Client,
    origin_override: Option<String>,
}

impl DidWebResolver {
    pub fn new(config: &TrustConfig) -> TrustResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(TRUST_USER_AGENT));
        default_headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/did+json, application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| TrustError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            origin_override: config.origin_override.clone(),
        })
    }

    /// HTTP location of a registry URI.
    pub fn location(&self, uri: &str) -> TrustResult<url::Url> {
        if uri.starts_with("did:web:") {
            return did_web_location(uri, self.origin_override.as_deref());
        }
        if uri.starts_with("https://") || uri.starts_with("http://") {
            return url::Url::parse(uri).map_err(|_| TrustError::UnsupportedUri {
                uri: uri.to_string(),
            });
        }
        Err(TrustError::UnsupportedUri {
            uri: uri.to_string(),
        })
    }
}

#[async_trait]
impl DocumentResolver for DidWebResolver {
    async fn resolve(&self, uri: &str) -> TrustResult<DidDocument> {
        let location = self.location(uri)?;
        debug!(uri = %uri, url = %location, "fetching trust document");

        let response = self.client.get(location.clone()).send().await?;
        let status = response.status();

        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(TrustError::NotFound {
                    uri: uri.to_string(),
                })
            }
            _ => {
                return Err(TrustError::Network {
                    message: format!("HTTP {} from {}", status.as_u16(), location),
                })
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > MAX_DOCUMENT_BYTES {
                return Err(TrustError::InvalidDocument {
                    uri: uri.to_string(),
                    message: format!("document too large: {} bytes", len),
                });
            }
        }

        let body = response.bytes().await.map_err(|e| TrustError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        DidDocument::from_slice(uri, &body)
    }
}

/// In-memory documents, for offline trust lists and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDocumentResolver {
    documents: HashMap<String, DidDocument>,
}

impl StaticDocumentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` for `uri`.
    pub fn with_document(mut self, uri: impl Into<String>, document: DidDocument) -> Self {
        self.documents.insert(uri.into(), document);
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, document: DidDocument) {
        self.documents.insert(uri.into(), document);
    }
}

#[async_trait]
impl DocumentResolver for StaticDocumentResolver {
    async fn resolve(&self, uri: &str) -> TrustResult<DidDocument> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| TrustError::NotFound {
                uri: uri.to_string(),
            })
    }
}
