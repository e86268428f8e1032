use clap::Parser;
use sigma_cli::{Cli, run, tracing_setup};
use std::io;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.log_json)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Sigma");

    let stdin = io::stdin();
    let stdout = io::stdout();
    run(cli, &mut stdin.lock(), &mut stdout.lock())
}
