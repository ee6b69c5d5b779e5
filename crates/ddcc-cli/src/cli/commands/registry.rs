//! Building the trust registry from command-line flags.

use anyhow::{Context, Result};
use ddcc_trust::{
    DidDocument, LoadReport, RegistryEntity, Scope, StaticDocumentResolver, TrustConfig,
    TrustRegistry,
};
use std::sync::Arc;

use crate::cli::args::RegistryArgs;

/// Environment configuration with flag overrides applied.
pub fn trust_config(args: &RegistryArgs) -> TrustConfig {
    let mut config = TrustConfig::from_env();
    if let Some(did) = &args.production_did {
        config = config.with_production_did(did);
    }
    if let Some(did) = &args.acceptance_did {
        config = config.with_acceptance_did(did);
    }
    if args.no_fallback {
        config = config.with_fallback_controller(None);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout_secs(secs);
    }
    if let Some(origin) = &args.origin {
        config = config.with_origin_override(origin);
    }
    config
}

/// Load the registry, either from `--trust-file` documents or over did:web.
pub async fn load(args: &RegistryArgs) -> Result<(Arc<TrustRegistry>, LoadReport)> {
    let config = trust_config(args);

    if args.trust_files.is_empty() {
        let registry =
            TrustRegistry::did_web(config).context("failed to build did:web trust registry")?;
        let report = registry.init_default().await;
        return Ok((Arc::new(registry), report));
    }

    let mut resolver = StaticDocumentResolver::new();
    let mut entries = Vec::with_capacity(args.trust_files.len());
    for path in &args.trust_files {
        let uri = path.display().to_string();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read trust file: {}", path.display()))?;
        let document = DidDocument::from_slice(&uri, &bytes)
            .with_context(|| format!("failed to parse trust file: {}", path.display()))?;
        let scope = if document.id == config.acceptance_did {
            Scope::AcceptanceTest
        } else {
            Scope::Production
        };
        resolver.insert(uri.clone(), document);
        entries.push(RegistryEntity::new(scope, uri));
    }

    let registry = TrustRegistry::new(config, Arc::new(resolver));
    let report = registry.init(&entries).await;
    Ok((Arc::new(registry), report))
}
