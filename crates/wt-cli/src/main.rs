use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{preview, projects, reconcile, split_lunch};
use wt_cli::{Cli, Commands, Config};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();
    let success = match command {
        Commands::Reconcile(args) => reconcile::run(&mut stdout, args, &config)?,
        Commands::SplitLunch(args) => split_lunch::run(&mut stdout, args, &config)?,
        Commands::Preview(args) => {
            preview::run(&mut stdout, args, &config)?;
            true
        }
        Commands::Projects { json } => {
            projects::run(&mut stdout, *json, &config)?;
            true
        }
    };
    stdout.flush()?;

    if success {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("some entries could not be reconciled, see the report above");
        Ok(ExitCode::FAILURE)
    }
}
