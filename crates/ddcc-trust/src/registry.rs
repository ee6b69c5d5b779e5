//! Federated trust registry.
//!
//! The registry maps key-identifier URIs to [`TrustedEntity`] records. Its
//! contents are an immutable [`TrustSnapshot`]: `init` builds a new snapshot
//! from every configured trust source and publishes it in one swap, so a
//! concurrent `resolve` sees either the previous or the new store, never a
//! partially populated one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::did::VerificationMethod;
use crate::error::{KeyDecodeError, TrustResult};
use crate::keys::KeyMaterialDecoder;
use crate::resolver::{DidWebResolver, DocumentResolver};
use crate::types::{Framework, RegistryEntity, Scope, TrustConfig, TrustedEntity};

/// Lookup seam used by verifiers.
pub trait TrustResolver: Send + Sync {
    /// Find the entity for a credential's key identifier.
    fn resolve(&self, framework: Framework, kid: &str) -> Option<Arc<TrustedEntity>>;
}

/// Immutable key-id URI → entity map.
#[derive(Debug, Clone, Default)]
pub struct TrustSnapshot {
    entities: HashMap<String, Arc<TrustedEntity>>,
}

impl TrustSnapshot {
    pub fn get(&self, key_id: &str) -> Option<&Arc<TrustedEntity>> {
        self.entities.get(key_id)
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.entities.contains_key(key_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All key ids, sorted.
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entities.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// A verification method that was dropped while loading a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMethod {
    pub kid: String,
    pub reason: KeyDecodeError,
}

/// What happened to one trust source during `init`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Loaded {
        loaded: usize,
        skipped: Vec<SkippedMethod>,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub uri: String,
    pub scope: Scope,
    pub outcome: SourceOutcome,
    pub elapsed_ms: u64,
}

/// Aggregated diagnostics of an `init` pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub sources: Vec<SourceReport>,

    /// Entities in the published snapshot, pinned ones included.
    pub total_entities: usize,
}

impl LoadReport {
    /// Keys loaded from fetched sources.
    pub fn loaded(&self) -> usize {
        self.sources
            .iter()
            .map(|s| match &s.outcome {
                SourceOutcome::Loaded { loaded, .. } => *loaded,
                SourceOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedMethod> {
        self.sources.iter().flat_map(|s| match &s.outcome {
            SourceOutcome::Loaded { skipped, .. } => skipped.as_slice(),
            SourceOutcome::Failed { .. } => &[][..],
        })
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Failed { .. }))
    }

    /// Every source fetched and every method decoded.
    pub fn is_complete(&self) -> bool {
        self.failed_sources().next().is_none() && self.skipped().next().is_none()
    }
}

/// Trust registry backed by DID documents.
pub struct TrustRegistry {
    config: TrustConfig,
    resolver: Arc<dyn DocumentResolver>,
    decoder: KeyMaterialDecoder,
    pinned: Vec<(String, Arc<TrustedEntity>)>,
    snapshot: RwLock<Arc<TrustSnapshot>>,
}

impl fmt::Debug for TrustRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustRegistry")
            .field("config", &self.config)
            .field("pinned", &self.pinned.len())
            .field("entities", &self.snapshot.read().len())
            .finish_non_exhaustive()
    }
}

impl TrustRegistry {
    /// Create an empty registry fetching through `resolver`.
    pub fn new(config: TrustConfig, resolver: Arc<dyn DocumentResolver>) -> Self {
        Self {
            config,
            resolver,
            decoder: KeyMaterialDecoder::new(),
            pinned: Vec::new(),
            snapshot: RwLock::new(Arc::new(TrustSnapshot::default())),
        }
    }

    /// Create an empty registry fetching did:web documents over HTTPS.
    pub fn did_web(config: TrustConfig) -> TrustResult<Self> {
        let resolver = DidWebResolver::new(&config)?;
        Ok(Self::new(config, Arc::new(resolver)))
    }

    /// Add an entity that is part of every snapshot.
    ///
    /// Pinned entities are re-seeded on each `init` and can be overridden by
    /// a fetched source publishing the same key id.
    pub fn with_pinned(mut self, key_id: impl Into<String>, entity: TrustedEntity) -> Self {
        self.pinned.push((key_id.into(), Arc::new(entity)));
        let seeded = self.seed_snapshot();
        *self.snapshot.write() = Arc::new(seeded);
        self
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<TrustSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }

    /// Load the configured production and acceptance registries.
    pub async fn init_default(&self) -> LoadReport {
        info!("initializing trust registry from default sources");
        let entries = self.config.default_registries();
        self.init(&entries).await
    }

    /// Rebuild the store from `entries`.
    ///
    /// Sources are fetched concurrently; a failing source is logged and
    /// reported without affecting the others. Results are merged in the
    /// order of `entries`, so a later source wins duplicate key ids.
    pub async fn init(&self, entries: &[RegistryEntity]) -> LoadReport {
        let loads = join_all(entries.iter().map(|entry| self.load_source(entry))).await;

        let mut snapshot = self.seed_snapshot();
        let mut sources = Vec::with_capacity(loads.len());
        for (report, entities) in loads {
            for (key_id, entity) in entities {
                snapshot.entities.insert(key_id, Arc::new(entity));
            }
            sources.push(report);
        }

        let total_entities = snapshot.len();
        *self.snapshot.write() = Arc::new(snapshot);

        let report = LoadReport {
            sources,
            total_entities,
        };
        info!(
            sources = report.sources.len(),
            loaded = report.loaded(),
            failed = report.failed_sources().count(),
            total = total_entities,
            "trust registry initialized"
        );
        report
    }

    fn seed_snapshot(&self) -> TrustSnapshot {
        TrustSnapshot {
            entities: self
                .pinned
                .iter()
                .map(|(id, entity)| (id.clone(), Arc::clone(entity)))
                .collect(),
        }
    }

    async fn load_source(&self, entry: &RegistryEntity) -> (SourceReport, Vec<(String, TrustedEntity)>) {
        let started = Instant::now();
        let uri = entry.resolvable_uri.as_str();

        let document = match self.resolver.resolve(uri).await {
            Ok(document) => document,
            Err(e) => {
                warn!(uri = %uri, error = %e, "failed to load trust source");
                let report = SourceReport {
                    uri: uri.to_string(),
                    scope: entry.scope,
                    outcome: SourceOutcome::Failed {
                        reason: e.to_string(),
                    },
                    elapsed_ms: elapsed_ms(started),
                };
                return (report, Vec::new());
            }
        };

        let mut entities = Vec::new();
        let mut skipped = Vec::new();
        for method in document.verification_methods() {
            match self.entity_for(&method, entry.scope) {
                Ok(entity) => {
                    debug!(kid = %method.id, kind = entity.public_key.kind(), "loaded key");
                    entities.push((method.id.clone(), entity));
                }
                Err(reason) => {
                    warn!(kid = %method.id, error = %reason, "skipping key");
                    skipped.push(SkippedMethod {
                        kid: method.id.clone(),
                        reason,
                    });
                }
            }
        }

        let report = SourceReport {
            uri: uri.to_string(),
            scope: entry.scope,
            outcome: SourceOutcome::Loaded {
                loaded: entities.len(),
                skipped,
            },
            elapsed_ms: elapsed_ms(started),
        };
        info!(
            uri = %uri,
            loaded = entities.len(),
            elapsed_ms = report.elapsed_ms,
            "trust source loaded"
        );
        (report, entities)
    }

    fn entity_for(
        &self,
        method: &VerificationMethod,
        scope: Scope,
    ) -> Result<TrustedEntity, KeyDecodeError> {
        let key = self.decoder.try_decode(method)?;
        Ok(TrustedEntity::new(method.id.clone(), scope, key))
    }

    /// Key-id URIs tried for `kid`, in lookup order.
    pub fn candidate_key_ids(&self, kid: &str) -> Vec<String> {
        let production = &self.config.production_did;
        let acceptance = &self.config.acceptance_did;

        // Segments after the second '#' are ignored.
        let mut parts = kid.split('#');
        match (parts.next(), parts.next()) {
            (Some(controller), Some(fragment)) => {
                let controller = url_encode(controller);
                let fragment = url_encode(fragment);
                vec![
                    format!("{}:{}#{}", production, controller, fragment),
                    format!("{}:{}#{}", acceptance, controller, fragment),
                ]
            }
            _ => {
                let fragment = url_encode(kid);
                let mut candidates = vec![format!("{}:{}#{}", production, fragment, fragment)];
                if let Some(controller) = &self.config.bare_kid_fallback_controller {
                    candidates.push(format!("{}:{}#{}", acceptance, controller, fragment));
                }
                candidates
            }
        }
    }
}

impl TrustResolver for TrustRegistry {
    fn resolve(&self, framework: Framework, kid: &str) -> Option<Arc<TrustedEntity>> {
        let snapshot = self.snapshot();
        let found = self
            .candidate_key_ids(kid)
            .into_iter()
            .find_map(|candidate| snapshot.get(&candidate).cloned());

        debug!(
            framework = %framework,
            kid = %kid,
            found = found.is_some(),
            "resolved kid"
        );
        found
    }
}

/// `application/x-www-form-urlencoded` encoding of a kid component.
fn url_encode(part: &str) -> String {
    url::form_urlencoded::byte_serialize(part.as_bytes()).collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
