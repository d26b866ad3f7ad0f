//! Pull/push synchronization engine
//!
//! Clients pull every record changed after their last watermark, edit offline, and push
//! edited records back. Conflicts are resolved per whole record by last-write-wins on
//! `updatedAt`, with ties going to the server copy so that echoing a freshly pulled record
//! is a no-op. The engine keeps no state between requests.

mod pull;
mod push;
mod report;

use std::sync::Arc;

pub use report::{PushReport, PushResponse, RecordFailure, RecordOutcome, SkipReason};

use crate::db::Database;
use crate::error::Result;
use crate::models::{PullResponse, SyncBatch, SyncConflict};
use crate::timestamp::{Clock, SystemClock, Timestamp};

/// Entry point for pull and push requests
#[derive(Clone)]
pub struct SyncEngine {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    /// Create an engine stamping with wall-clock time
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    /// Create an engine with a custom time source
    pub fn with_clock(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Export records changed after `since`, or everything when `since` is `None`
    ///
    /// The returned `synced_at` is read before any collection, so writes racing with the
    /// pull are stamped no earlier than the watermark.
    pub fn pull(&self, since: Option<&Timestamp>) -> Result<PullResponse> {
        let synced_at = self.clock.now();
        let batch = pull::assemble(&self.db, since)?;

        tracing::info!(
            since = since.map_or("<full>", Timestamp::as_str),
            records = batch.len(),
            synced_at = %synced_at,
            "Assembled pull"
        );
        Ok(PullResponse { synced_at, batch })
    }

    /// Merge an incoming batch into the store
    ///
    /// Never fails as a whole: per-record errors are reported in [`PushReport::failed`].
    pub fn push(&self, batch: &SyncBatch) -> PushReport {
        let stamp = self.clock.now();
        let report = push::ConflictResolver::new(&self.db, stamp).apply(batch);

        tracing::info!(
            processed = report.processed(),
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            synced_at = %report.synced_at,
            "Applied push"
        );
        report
    }

    /// Most recent conflicts lost by incoming records, newest first
    pub fn conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.db.conflicts().recent(limit)
    }
}
