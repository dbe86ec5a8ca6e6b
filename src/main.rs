use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nn_classifier::cli::{Cli, Command};
use nn_classifier::command;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .with_context(|| format!("invalid log level {:?}", cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::Train(args) => {
            command::train(&args).context("train command failed")?;
        }
    }
    Ok(())
}
