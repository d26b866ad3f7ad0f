//! Database layer for Sprout

mod collection;
mod conflict_log;
mod connection;
mod migrations;

pub use collection::{CollectionStore, TableStore};
pub use conflict_log::{ConflictLog, NewConflict, LWW_STRATEGY};
pub use connection::Database;
