use std::env;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use sprout_core::db::Database;
use sprout_core::{SyncBatch, SyncEngine};

use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("SPROUT_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sprout")
        .join("sprout.db")
}

pub fn open_engine(db_path: &Path) -> Result<SyncEngine, CliError> {
    let db = Database::open(db_path)?;
    Ok(SyncEngine::new(Arc::new(db)))
}

/// Read a batch from a file, or stdin when the path is `-`
pub fn read_batch(path: &Path) -> Result<SyncBatch, CliError> {
    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };

    let value: Value = serde_json::from_str(&raw)?;
    Ok(SyncBatch::from_value(value)?)
}

pub fn display_or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
