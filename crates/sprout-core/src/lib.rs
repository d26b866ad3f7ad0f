//! sprout-core - Core library for Sprout
//!
//! This crate contains the entity registry, the SQLite store, and the pull/push sync
//! engine shared by the Sprout API server and CLI.

pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod sync;
pub mod timestamp;

pub use error::{Error, Result};
pub use models::{EntityRecord, PullResponse, RecordId, SyncBatch};
pub use sync::{PushReport, PushResponse, SyncEngine};
pub use timestamp::Timestamp;
