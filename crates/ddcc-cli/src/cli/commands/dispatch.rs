use crate::cli::args::{Cli, Command};
use crate::exit_codes::VERIFIED;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Verify(args) => super::verify::run(args).await,
        Command::Detect(args) => super::detect::run(args),
        Command::Trust(args) => super::trust::run(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(VERIFIED)
        }
    }
}
