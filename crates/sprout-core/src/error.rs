//! Error types for sprout-core

use thiserror::Error;

/// Result type alias using sprout-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sprout-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error not tied to a driver call
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown collection name
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error describes bad caller input rather than a storage fault
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::UnknownCollection(_))
    }
}
