//! Conflict log repository

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use rusqlite::{params, Row};

use super::Database;
use crate::error::Result;
use crate::models::{RecordId, SyncConflict};
use crate::timestamp::Timestamp;

/// Strategy name recorded for last-write-wins rejections
pub const LWW_STRATEGY: &str = "lww";

/// Rows kept in `sync_conflicts`; older entries are dropped as new ones arrive
pub const MAX_RETAINED_CONFLICTS: usize = 10_000;

/// A rejected incoming write about to be logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConflict<'a> {
    pub collection: &'a str,
    pub record_id: RecordId,
    pub server_updated_at: Option<&'a Timestamp>,
    pub incoming_updated_at: Option<&'a Timestamp>,
    pub resolved_at: &'a Timestamp,
}

/// Append-only log of writes that lost to a newer server copy
pub struct ConflictLog<'a> {
    db: &'a Database,
}

impl<'a> ConflictLog<'a> {
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record one rejected write, then trim the log to [`MAX_RETAINED_CONFLICTS`]
    pub fn record(&self, conflict: &NewConflict<'_>) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO sync_conflicts (
                    collection, record_id, server_updated_at, incoming_updated_at, resolved_at, strategy
                ) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    conflict.collection,
                    conflict.record_id,
                    conflict.server_updated_at.map(Timestamp::as_str),
                    conflict.incoming_updated_at.map(Timestamp::as_str),
                    conflict.resolved_at.as_str(),
                    LWW_STRATEGY,
                ],
            )?;
            Ok(())
        })?;
        self.prune(MAX_RETAINED_CONFLICTS)?;
        Ok(())
    }

    /// Delete all but the `keep` most recently logged conflicts; returns the rows removed
    pub fn prune(&self, keep: usize) -> Result<usize> {
        self.db.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM sync_conflicts
                 WHERE id <= (SELECT id FROM sync_conflicts ORDER BY id DESC LIMIT 1 OFFSET ?)",
                params![keep as i64],
            )?;
            Ok(removed)
        })
    }

    /// Most recently resolved conflicts, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, collection, record_id, server_updated_at, incoming_updated_at,
                        resolved_at, strategy
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?",
            )?;
            let conflicts = stmt
                .query_map(params![limit as i64], Self::parse_conflict)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(conflicts)
        })
    }

    fn parse_conflict(row: &Row<'_>) -> rusqlite::Result<SyncConflict> {
        Ok(SyncConflict {
            id: row.get(0)?,
            collection: row.get(1)?,
            record_id: row.get(2)?,
            server_updated_at: row.get(3)?,
            incoming_updated_at: row.get(4)?,
            resolved_at: row.get(5)?,
            strategy: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_conflict(log: &ConflictLog<'_>, record_id: RecordId, resolved: &str) {
        let server = Timestamp::from_stored("2024-05-02T00:00:00.000Z");
        let incoming = Timestamp::from_stored("2024-05-01T00:00:00.000Z");
        let resolved_at = Timestamp::from_stored(resolved);
        log.record(&NewConflict {
            collection: "tasks",
            record_id,
            server_updated_at: Some(&server),
            incoming_updated_at: Some(&incoming),
            resolved_at: &resolved_at,
        })
        .unwrap();
    }

    #[test]
    fn test_record_and_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let log = db.conflicts();

        log_conflict(&log, 1, "2024-06-01T00:00:00.000Z");
        log_conflict(&log, 2, "2024-06-02T00:00:00.000Z");

        let conflicts = log.recent(10).unwrap();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].record_id, 2);
        assert_eq!(conflicts[0].strategy, LWW_STRATEGY);
        assert_eq!(
            conflicts[1].incoming_updated_at.as_deref(),
            Some("2024-05-01T00:00:00.000Z")
        );

        assert_eq!(log.recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_prune_keeps_most_recent() {
        let db = Database::open_in_memory().unwrap();
        let log = db.conflicts();
        for record_id in 1..=5 {
            log_conflict(&log, record_id, "2024-06-01T00:00:00.000Z");
        }

        assert_eq!(log.prune(2).unwrap(), 3);
        let kept: Vec<_> = log.recent(10).unwrap().iter().map(|c| c.record_id).collect();
        assert_eq!(kept, vec![5, 4]);

        assert_eq!(log.prune(2).unwrap(), 0);
        assert_eq!(log.prune(10).unwrap(), 0);
        assert_eq!(log.prune(0).unwrap(), 2);
        assert!(log.recent(10).unwrap().is_empty());
    }
}
