//! Conflict resolution for pushes

use crate::db::{CollectionStore, Database, NewConflict};
use crate::error::{Error, Result};
use crate::models::{EntityRecord, RecordId, SyncBatch};
use crate::registry::{self, CollectionSpec};
use crate::sync::report::{PushReport, RecordOutcome, SkipReason};
use crate::timestamp::{is_newer, Timestamp};

/// Merges one incoming batch into the store under last-write-wins
///
/// Every accepted write is stamped with the same server time, which replaces whatever
/// `updatedAt` the client sent. Records are independent: a failing record is tallied and
/// the rest of the batch continues.
pub(super) struct ConflictResolver<'a> {
    db: &'a Database,
    report: PushReport,
}

impl<'a> ConflictResolver<'a> {
    pub(super) const fn new(db: &'a Database, stamp: Timestamp) -> Self {
        Self {
            db,
            report: PushReport::new(stamp),
        }
    }

    /// Apply the singleton first, then each keyed collection in registry order
    pub(super) fn apply(mut self, batch: &SyncBatch) -> PushReport {
        if let Some(settings) = batch.settings() {
            let spec = registry::singleton();
            let outcome = self.apply_singleton(spec, settings);
            self.tally(spec, settings, outcome);
        }

        for spec in registry::keyed() {
            for record in batch.records(spec.name) {
                let outcome = self.apply_keyed(spec, record);
                self.tally(spec, record, outcome);
            }
        }

        self.report
    }

    fn stamp(&self) -> &Timestamp {
        &self.report.synced_at
    }

    fn tally(
        &mut self,
        spec: &CollectionSpec,
        record: &EntityRecord,
        outcome: Result<RecordOutcome>,
    ) {
        match outcome {
            Ok(outcome) => {
                tracing::trace!(collection = spec.name, ?outcome, "Resolved record");
                self.report.record_outcome(outcome);
            }
            Err(error) => {
                let id = record.id().ok().flatten();
                tracing::warn!(
                    collection = spec.name,
                    id = ?id,
                    error = %error,
                    "Failed to apply pushed record"
                );
                self.report.record_failure(spec.name, id, error.to_string());
            }
        }
    }

    fn apply_singleton(
        &self,
        spec: &'static CollectionSpec,
        record: &EntityRecord,
    ) -> Result<RecordOutcome> {
        let incoming_at = record.checked_updated_at()?;
        let store = self.db.collection(spec);
        let Some(existing) = store.first()? else {
            // The singleton's identity belongs to the server, whatever id the client sent
            let mut record = record.clone();
            record.remove(CollectionSpec::ID_FIELD);
            return self.insert_or_overwrite(spec, &record, incoming_at.as_ref());
        };

        let id = existing
            .id()?
            .ok_or_else(|| Error::Database(format!("{} row without id", spec.name)))?;
        self.overwrite_if_newer(spec, id, record, incoming_at.as_ref(), &existing)
    }

    fn apply_keyed(
        &self,
        spec: &'static CollectionSpec,
        record: &EntityRecord,
    ) -> Result<RecordOutcome> {
        let Some(id) = record.id()? else {
            return Ok(RecordOutcome::Skipped(SkipReason::Unidentified));
        };
        let incoming_at = record.checked_updated_at()?;

        match self.db.collection(spec).get_by_id(id)? {
            None => self.insert_or_overwrite(spec, record, incoming_at.as_ref()),
            Some(existing) => {
                self.overwrite_if_newer(spec, id, record, incoming_at.as_ref(), &existing)
            }
        }
    }

    /// Insert a record the server does not have yet
    ///
    /// If another writer created the same id in the meantime, fall back to the guarded
    /// overwrite so the timestamp rule still decides.
    fn insert_or_overwrite(
        &self,
        spec: &'static CollectionSpec,
        record: &EntityRecord,
        incoming_at: Option<&Timestamp>,
    ) -> Result<RecordOutcome> {
        let store = self.db.collection(spec);
        if store.insert(record, self.stamp())?.is_some() {
            return Ok(RecordOutcome::Applied);
        }

        let id = record
            .id()?
            .ok_or_else(|| Error::Database(format!("{} insert without id was ignored", spec.name)))?;
        if store.update(id, record, self.stamp(), incoming_at)? {
            Ok(RecordOutcome::Applied)
        } else {
            Ok(RecordOutcome::Skipped(SkipReason::LostRace))
        }
    }

    fn overwrite_if_newer(
        &self,
        spec: &'static CollectionSpec,
        id: RecordId,
        record: &EntityRecord,
        incoming_at: Option<&Timestamp>,
        existing: &EntityRecord,
    ) -> Result<RecordOutcome> {
        let existing_at = existing.updated_at();

        if !is_newer(incoming_at, existing_at.as_ref()) {
            if incoming_at == existing_at.as_ref() {
                return Ok(RecordOutcome::Skipped(SkipReason::Unchanged));
            }
            self.log_conflict(spec, id, existing_at.as_ref(), incoming_at);
            return Ok(RecordOutcome::Skipped(SkipReason::Stale));
        }

        let written = self
            .db
            .collection(spec)
            .update(id, record, self.stamp(), incoming_at)?;
        if written {
            Ok(RecordOutcome::Applied)
        } else {
            Ok(RecordOutcome::Skipped(SkipReason::LostRace))
        }
    }

    fn log_conflict(
        &self,
        spec: &CollectionSpec,
        id: RecordId,
        server_updated_at: Option<&Timestamp>,
        incoming_updated_at: Option<&Timestamp>,
    ) {
        let conflict = NewConflict {
            collection: spec.name,
            record_id: id,
            server_updated_at,
            incoming_updated_at,
            resolved_at: self.stamp(),
        };
        if let Err(error) = self.db.conflicts().record(&conflict) {
            tracing::warn!(
                collection = spec.name,
                id,
                error = %error,
                "Failed to log sync conflict"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;

    const STORED_AT: &str = "2024-05-02T00:00:00.000Z";
    const SERVER_NOW: &str = "2024-06-01T00:00:00.000Z";

    fn record(value: Value) -> EntityRecord {
        EntityRecord::try_from(value).unwrap()
    }

    /// A store already holding yard 1, as if another push created it first
    fn store_with_yard() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.collection(registry::lookup("yards").unwrap())
            .insert(
                &record(json!({"id": 1, "name": "Front"})),
                &Timestamp::from_stored(STORED_AT),
            )
            .unwrap()
            .unwrap();
        db
    }

    fn insert_racing(db: &Database, name: &str, updated_at: &str) -> RecordOutcome {
        let spec = registry::lookup("yards").unwrap();
        let incoming = record(json!({"id": 1, "name": name, "updatedAt": updated_at}));
        let incoming_at = incoming.checked_updated_at().unwrap();
        ConflictResolver::new(db, Timestamp::from_stored(SERVER_NOW))
            .insert_or_overwrite(spec, &incoming, incoming_at.as_ref())
            .unwrap()
    }

    fn stored_yard(db: &Database) -> EntityRecord {
        db.collection(registry::lookup("yards").unwrap())
            .get_by_id(1)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_insert_race_newer_incoming_overwrites() {
        let db = store_with_yard();

        let outcome = insert_racing(&db, "Front garden", "2024-05-03T00:00:00Z");

        assert_eq!(outcome, RecordOutcome::Applied);
        let stored = stored_yard(&db);
        assert_eq!(stored.get("name"), Some(&json!("Front garden")));
        assert_eq!(stored.updated_at(), Some(Timestamp::from_stored(SERVER_NOW)));
    }

    #[test]
    fn test_insert_race_older_or_equal_incoming_loses() {
        let db = store_with_yard();

        for updated_at in ["2024-05-01T00:00:00Z", STORED_AT] {
            let outcome = insert_racing(&db, "Stale", updated_at);
            assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::LostRace));
        }

        let stored = stored_yard(&db);
        assert_eq!(stored.get("name"), Some(&json!("Front")));
        assert_eq!(stored.updated_at(), Some(Timestamp::from_stored(STORED_AT)));
    }

    #[test]
    fn test_singleton_insert_ignores_client_id() {
        let db = Database::open_in_memory().unwrap();
        let batch = SyncBatch::new().with_settings(record(json!({"id": "abc", "zipCode": "97201"})));

        let report = ConflictResolver::new(&db, Timestamp::from_stored(SERVER_NOW)).apply(&batch);

        assert_eq!((report.applied, report.failed), (1, 0));
        let stored = db.collection(registry::singleton()).first().unwrap().unwrap();
        assert_eq!(stored.get("zipCode"), Some(&json!("97201")));
    }

    #[test]
    fn test_malformed_incoming_timestamp_fails_record() {
        let db = store_with_yard();
        let batch = SyncBatch::new()
            .with_records(
                "yards",
                vec![
                    record(json!({"id": 1, "name": "Bad", "updatedAt": "soon"})),
                    record(json!({"id": 2, "name": "Back", "updatedAt": 42})),
                ],
            )
            .unwrap();

        let report = ConflictResolver::new(&db, Timestamp::from_stored(SERVER_NOW)).apply(&batch);

        assert_eq!((report.applied, report.failed), (0, 2));
        assert_eq!(stored_yard(&db).get("name"), Some(&json!("Front")));
    }
}
