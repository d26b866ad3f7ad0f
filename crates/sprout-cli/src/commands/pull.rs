use std::path::Path;

use sprout_core::{PullResponse, Timestamp};

use crate::commands::common::open_engine;
use crate::error::CliError;

pub fn pull_batch(since: Option<&str>, db_path: &Path) -> Result<PullResponse, CliError> {
    let since = since.map(Timestamp::parse).transpose()?;
    let engine = open_engine(db_path)?;
    Ok(engine.pull(since.as_ref())?)
}

pub fn run_pull(
    since: Option<&str>,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let response = pull_batch(since, db_path)?;
    let rendered = serde_json::to_string_pretty(&response)?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
