use std::path::Path;

use sprout_core::{PushReport, PushResponse};

use crate::commands::common::{open_engine, read_batch};
use crate::error::CliError;

pub fn push_file(file: &Path, db_path: &Path) -> Result<PushReport, CliError> {
    let batch = read_batch(file)?;
    let engine = open_engine(db_path)?;
    Ok(engine.push(&batch))
}

pub fn run_push(file: &Path, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let report = push_file(file, db_path)?;

    if as_json {
        let response = PushResponse::from(report);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    for line in format_push_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_push_lines(report: &PushReport) -> Vec<String> {
    let mut lines = vec![format!(
        "applied={} skipped={} failed={}  synced at {}",
        report.applied, report.skipped, report.failed, report.synced_at
    )];
    lines.extend(report.failures.iter().map(|failure| {
        let id = failure
            .id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        format!("  {}#{id}: {}", failure.collection, failure.error)
    }));
    lines
}
