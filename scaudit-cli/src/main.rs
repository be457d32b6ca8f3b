//! scaudit -- SCA audit command-line tool

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use scaudit_core::config::ScauditConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let writer = OutputWriter::new(cli.output);
    let loaded = ScauditConfig::load_or_default(&cli.config).await;

    // a broken config still gets logging so `config validate` can report it
    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = cli.log_level {
        general.log_level = level;
    }
    logging::init_tracing(&general)?;
    scaudit_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "scaudit starting");

    match cli.command {
        Commands::Audit(args) => {
            let config = loaded.map_err(CliError::from)?;
            commands::audit::execute(args, config, &writer).await?;
        }
        Commands::Config(args) => {
            commands::config::execute(args, &cli.config, &writer).await?;
        }
    }

    Ok(())
}
