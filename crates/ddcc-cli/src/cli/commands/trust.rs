//! `ddcc trust` - Inspect the trust registry.

use anyhow::Result;
use clap::{Args, Subcommand};
use ddcc_trust::{Framework, LoadReport, SourceOutcome, TrustResolver};

use super::registry;
use crate::cli::args::{FrameworkArg, RegistryArgs};
use crate::exit_codes::{REJECTED, VERIFIED};

#[derive(Args, Debug, Clone)]
pub struct TrustArgs {
    #[command(subcommand)]
    pub cmd: TrustCmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TrustCmd {
    /// Load the trust sources and report what each contributed
    Load(TrustLoadArgs),
    /// Resolve a kid to the trusted entity a verifier would use
    Resolve(TrustResolveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TrustLoadArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// List every loaded key id
    #[arg(long)]
    pub keys: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrustResolveArgs {
    /// Key identifier as carried in a credential (`controller#fragment` or bare)
    pub kid: String,

    #[arg(long, value_enum, default_value = "dcc")]
    pub framework: FrameworkArg,

    #[command(flatten)]
    pub registry: RegistryArgs,
}

pub async fn run(args: TrustArgs) -> Result<i32> {
    match args.cmd {
        TrustCmd::Load(args) => load(args).await,
        TrustCmd::Resolve(args) => resolve(args).await,
    }
}

async fn load(args: TrustLoadArgs) -> Result<i32> {
    let (registry, report) = registry::load(&args.registry).await?;
    print_report(&report);

    if args.keys {
        let key_ids = registry.snapshot().key_ids();
        for key_id in key_ids {
            println!("  {key_id}");
        }
    }

    Ok(if report.is_complete() { VERIFIED } else { REJECTED })
}

fn print_report(report: &LoadReport) {
    for source in &report.sources {
        match &source.outcome {
            SourceOutcome::Loaded { loaded, skipped } => {
                println!(
                    "{} [{:?}] loaded {} keys, skipped {} ({} ms)",
                    source.uri,
                    source.scope,
                    loaded,
                    skipped.len(),
                    source.elapsed_ms
                );
                for method in skipped {
                    println!("  skipped {}: {}", method.kid, method.reason);
                }
            }
            SourceOutcome::Failed { reason } => {
                println!("{} [{:?}] failed: {}", source.uri, source.scope, reason);
            }
        }
    }
    println!("{} trusted entities", report.total_entities);
}

async fn resolve(args: TrustResolveArgs) -> Result<i32> {
    let (registry, _) = registry::load(&args.registry).await?;
    let framework = Framework::from(args.framework);

    println!("Candidates:");
    for candidate in registry.candidate_key_ids(&args.kid) {
        println!("  {candidate}");
    }

    match registry.resolve(framework, &args.kid) {
        Some(entity) => {
            println!(
                "Trusted: {} [{:?}, {:?}, {}]",
                entity.display_name("en").unwrap_or("unnamed"),
                entity.scope,
                entity.status,
                entity.public_key.kind()
            );
            if let Some(valid_to) = entity.valid_to {
                println!("Valid to: {}", valid_to.to_rfc3339());
            }
            Ok(VERIFIED)
        }
        None => {
            println!("{framework} kid {} is not trusted", args.kid);
            Ok(REJECTED)
        }
    }
}
