//! Sync conflict model

use serde::{Deserialize, Serialize};

use crate::models::RecordId;

/// Incoming write rejected because the server copy was newer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Wire name of the collection the record belongs to
    pub collection: String,
    /// Record that kept its server copy
    pub record_id: RecordId,
    /// Server row's `updatedAt` when the conflict occurred
    pub server_updated_at: Option<String>,
    /// Incoming record's `updatedAt` that lost
    pub incoming_updated_at: Option<String>,
    /// When the push was resolved (server time)
    pub resolved_at: String,
    /// Resolution strategy name
    pub strategy: String,
}
