//! Push outcome tallying and the wire shape of sync responses

use serde::{Deserialize, Serialize};

use crate::models::RecordId;
use crate::timestamp::Timestamp;

/// Why an incoming record was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Keyed record without an id; the protocol cannot create ids
    Unidentified,
    /// Incoming `updatedAt` equals the server copy (usually an echo of a pulled record)
    Unchanged,
    /// Server copy is newer, or the incoming record has no timestamp
    Stale,
    /// A concurrent writer updated the row between the read and the conditional write
    LostRace,
}

/// Result of resolving one incoming record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Applied,
    Skipped(SkipReason),
}

/// A record whose write failed in storage or validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub collection: String,
    pub id: Option<RecordId>,
    pub error: String,
}

/// Aggregated result of one push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Server time stamped on every accepted write; the client's next pull watermark
    pub synced_at: Timestamp,
    pub failures: Vec<RecordFailure>,
}

impl PushReport {
    pub const fn new(synced_at: Timestamp) -> Self {
        Self {
            applied: 0,
            skipped: 0,
            failed: 0,
            synced_at,
            failures: Vec::new(),
        }
    }

    pub fn record_outcome(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Applied => self.applied += 1,
            RecordOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self, collection: &str, id: Option<RecordId>, error: String) {
        self.failed += 1;
        self.failures.push(RecordFailure {
            collection: collection.to_string(),
            id,
            error,
        });
    }

    /// Number of records the push looked at
    pub const fn processed(&self) -> usize {
        self.applied + self.skipped + self.failed
    }
}

/// `POST /sync` response body
///
/// `success` only says the request was processed; `applied: 0` is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub synced_at: Timestamp,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RecordFailure>,
}

impl From<PushReport> for PushResponse {
    fn from(report: PushReport) -> Self {
        Self {
            success: true,
            applied: report.applied,
            skipped: report.skipped,
            failed: report.failed,
            synced_at: report.synced_at,
            failures: report.failures,
        }
    }
}
