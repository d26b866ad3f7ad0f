use std::path::Path;

use sprout_core::models::SyncConflict;

use crate::commands::common::{display_or_dash, open_engine};
use crate::error::CliError;

pub fn list_sync_conflicts(limit: usize, db_path: &Path) -> Result<Vec<SyncConflict>, CliError> {
    if limit == 0 {
        return Err(CliError::EmptyLimit);
    }
    let engine = open_engine(db_path)?;
    Ok(engine.conflicts(limit)?)
}

pub fn run_conflicts(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let conflicts = list_sync_conflicts(limit, db_path)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  {}#{}  server={} incoming={}",
                conflict.resolved_at,
                conflict.strategy,
                conflict.collection,
                conflict.record_id,
                display_or_dash(conflict.server_updated_at.as_deref()),
                display_or_dash(conflict.incoming_updated_at.as_deref())
            )
        })
        .collect()
}
