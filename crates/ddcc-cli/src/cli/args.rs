use clap::{Args, Parser, Subcommand, ValueEnum};
use ddcc_trust::Framework;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ddcc",
    version,
    about = "Verify digital health credential QR payloads (HCERT, SMART Health Cards, DIVOC, ICAO VDS-NC)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode a QR payload and verify its signature against the trust lists
    Verify(VerifyArgs),
    /// Show which credential format a payload would be routed to
    Detect(DetectArgs),
    /// Inspect the trust registry
    Trust(super::commands::trust::TrustArgs),
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// QR payload text; read from --file or stdin when omitted
    pub payload: Option<String>,

    /// File holding the QR payload text
    #[arg(long, short, conflicts_with = "payload")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,

    /// Quiet mode - only exit code, no output
    #[arg(long, short, conflicts_with = "json")]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// QR payload text; read from --file or stdin when omitted
    pub payload: Option<String>,

    #[arg(long, short, conflicts_with = "payload")]
    pub file: Option<PathBuf>,
}

/// Where trust comes from. Flags override `DDCC_TRUST_*` variables.
#[derive(Args, Debug, Clone, Default)]
pub struct RegistryArgs {
    /// Production trust list DID
    #[arg(long)]
    pub production_did: Option<String>,

    /// Acceptance trust list DID
    #[arg(long)]
    pub acceptance_did: Option<String>,

    /// Do not fall back to the acceptance list for kids without a controller
    #[arg(long)]
    pub no_fallback: bool,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Serve did:web documents from this origin instead of their host
    #[arg(long)]
    pub origin: Option<String>,

    /// Offline trust list (DID document JSON); repeatable, disables fetching
    #[arg(long = "trust-file", value_name = "PATH")]
    pub trust_files: Vec<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameworkArg {
    Dcc,
    Shc,
    Divoc,
    Icao,
}

impl From<FrameworkArg> for Framework {
    fn from(arg: FrameworkArg) -> Self {
        match arg {
            FrameworkArg::Dcc => Framework::Dcc,
            FrameworkArg::Shc => Framework::Shc,
            FrameworkArg::Divoc => Framework::Divoc,
            FrameworkArg::Icao => Framework::Icao,
        }
    }
}
