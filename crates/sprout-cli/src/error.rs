use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] sprout_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Invalid batch JSON: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Conflict limit must be at least 1")]
    EmptyLimit,
}
