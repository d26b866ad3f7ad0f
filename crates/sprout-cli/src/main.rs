//! Sprout CLI - inspect and sync a local garden store
//!
//! Pulls and pushes sync batches as JSON files so a store can be seeded, backed up, or
//! reconciled without running the HTTP server.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::collections::run_collections;
use crate::commands::common::resolve_db_path;
use crate::commands::conflicts::run_conflicts;
use crate::commands::pull::run_pull;
use crate::commands::push::run_push;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    // Diagnostics go to stderr so pulled JSON on stdout stays clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    tracing::debug!(path = %db_path.display(), "Using local store");

    match cli.command {
        Commands::Pull { since, output } => {
            run_pull(since.as_deref(), output.as_deref(), &db_path)?;
        }
        Commands::Push { file, json } => run_push(&file, json, &db_path)?,
        Commands::Collections => run_collections(&db_path)?,
        Commands::Conflicts { limit, json } => run_conflicts(limit, json, &db_path)?,
    }

    Ok(())
}
