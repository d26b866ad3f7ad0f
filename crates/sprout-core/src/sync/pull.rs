//! Change-set assembly for pulls

use crate::db::{CollectionStore, Database};
use crate::error::Result;
use crate::models::SyncBatch;
use crate::registry;
use crate::timestamp::Timestamp;

/// Read every registered collection into a batch
///
/// Keyed collections are filtered by `since` (strictly after). The singleton is always
/// included whatever `since` says: clients need settings unconditionally and the record is
/// small.
pub(super) fn assemble(db: &Database, since: Option<&Timestamp>) -> Result<SyncBatch> {
    let mut batch = SyncBatch::new();

    let settings = db.collection(registry::singleton()).first()?;
    batch.set_settings(settings);

    for spec in registry::keyed() {
        let records = db.collection(spec).list_since(since)?;
        tracing::debug!(collection = spec.name, count = records.len(), "Pulled collection");
        batch.set_records(spec.name, records)?;
    }

    Ok(batch)
}
