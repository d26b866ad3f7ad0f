use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sprout")]
#[command(about = "Inspect and sync a local Sprout garden store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export records as a sync batch
    Pull {
        /// Only records changed after this ISO-8601 timestamp
        #[arg(long, value_name = "TIMESTAMP")]
        since: Option<String>,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Merge a sync batch into the store
    Push {
        /// JSON batch file, or `-` for stdin
        file: PathBuf,
        /// Output the push result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered collections with row counts
    Collections,
    /// List incoming writes rejected as stale
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
