//! Data models for Sprout sync

mod batch;
mod record;
mod sync_conflict;

pub use batch::{PullResponse, SyncBatch, SYNCED_AT_FIELD};
pub use record::{EntityRecord, RecordId};
pub use sync_conflict::SyncConflict;
