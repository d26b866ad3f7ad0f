use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sprout_core::models::SyncConflict;
use sprout_core::registry::CollectionKind;
use tempfile::TempDir;

use crate::commands::collections::{collection_summaries, format_collection_lines};
use crate::commands::common::{read_batch, resolve_db_path};
use crate::commands::conflicts::{format_sync_conflict_lines, list_sync_conflicts};
use crate::commands::pull::{pull_batch, run_pull};
use crate::commands::push::{format_push_lines, push_file};
use crate::error::CliError;

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, value.to_string()).unwrap();
    path
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("store").join("sprout.db")
}

#[test]
fn resolve_db_path_prefers_explicit_path() {
    let explicit = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn push_then_pull_through_files() {
    let dir = TempDir::new().unwrap();
    let db_path = store_path(&dir);
    let batch = write_json(
        &dir,
        "batch.json",
        &json!({
            "settings": {"zipCode": "97201", "hardinessZone": "8b"},
            "yards": [{"id": 1, "name": "Front", "updatedAt": "2024-05-01T00:00:00.000Z"}],
            "yardElements": [{"id": 1, "yardId": 1, "shapeType": "rect", "label": "Bed A"}],
        }),
    );

    let report = push_file(&batch, &db_path).unwrap();
    assert_eq!((report.applied, report.skipped, report.failed), (3, 0, 0));

    let output = dir.path().join("pulled.json");
    run_pull(None, Some(&output), &db_path).unwrap();
    let pulled: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(pulled["settings"]["hardinessZone"], "8b");
    assert_eq!(pulled["yardElements"][0]["label"], "Bed A");
    assert_eq!(pulled["tasks"], json!([]));

    let echoed = push_file(&output, &db_path).unwrap();
    assert_eq!(echoed.applied, 0);
    assert_eq!(echoed.skipped, 3);
}

#[test]
fn pull_since_filters_and_validates() {
    let dir = TempDir::new().unwrap();
    let db_path = store_path(&dir);
    let batch = write_json(&dir, "batch.json", &json!({"plants": [{"id": 1, "name": "Kale"}]}));
    let report = push_file(&batch, &db_path).unwrap();

    let after = pull_batch(Some(report.synced_at.as_str()), &db_path).unwrap();
    assert!(after.batch.records("plants").is_empty());

    let before = pull_batch(Some("2000-01-01T00:00:00Z"), &db_path).unwrap();
    assert_eq!(before.batch.records("plants").len(), 1);

    let err = pull_batch(Some("last tuesday"), &db_path).unwrap_err();
    assert!(matches!(err, CliError::Core(ref e) if e.is_invalid_input()));
}

#[test]
fn read_batch_rejects_malformed_files() {
    let dir = TempDir::new().unwrap();

    let bad_json = dir.path().join("bad.json");
    std::fs::write(&bad_json, "{ nope").unwrap();
    assert!(matches!(read_batch(&bad_json), Err(CliError::Serialization(_))));

    let bad_shape = write_json(&dir, "shape.json", &json!({"tasks": "not a list"}));
    assert!(matches!(read_batch(&bad_shape), Err(CliError::Core(_))));

    assert!(matches!(
        read_batch(Path::new("/definitely/missing/batch.json")),
        Err(CliError::Io(_))
    ));
}

#[test]
fn push_reports_failures_per_record() {
    let dir = TempDir::new().unwrap();
    let db_path = store_path(&dir);
    let batch = write_json(
        &dir,
        "batch.json",
        &json!({
            "plants": [{"id": 1, "name": "Bean"}],
            "plantings": [{"id": 1, "plantId": 99}],
        }),
    );

    let report = push_file(&batch, &db_path).unwrap();
    let lines = format_push_lines(&report);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("applied=1 skipped=0 failed=1"));
    assert!(lines[1].starts_with("  plantings#1: "));
}

#[test]
fn collections_lists_registry_with_counts() {
    let dir = TempDir::new().unwrap();
    let db_path = store_path(&dir);
    let batch = write_json(
        &dir,
        "batch.json",
        &json!({"tasks": [{"id": 1, "title": "Mulch"}, {"id": 2, "title": "Prune"}]}),
    );
    push_file(&batch, &db_path).unwrap();

    let summaries = collection_summaries(&db_path).unwrap();
    let names: Vec<_> = summaries.iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec![
            "settings",
            "yards",
            "yardElements",
            "plants",
            "plantings",
            "tasks",
            "journalEntries"
        ]
    );
    assert_eq!(summaries[0].kind, CollectionKind::Singleton);

    let tasks = summaries.iter().find(|s| s.name == "tasks").unwrap();
    assert_eq!(tasks.rows, 2);

    let lines = format_collection_lines(&summaries);
    assert!(lines[5].contains("rows=2"));
    assert!(lines[5].ends_with("after=plantings"));
}

#[test]
fn conflicts_lists_stale_pushes() {
    let dir = TempDir::new().unwrap();
    let db_path = store_path(&dir);
    let first = write_json(&dir, "first.json", &json!({"yards": [{"id": 1, "name": "Front"}]}));
    let stale = write_json(
        &dir,
        "stale.json",
        &json!({"yards": [{"id": 1, "name": "Old", "updatedAt": "2000-01-01T00:00:00.000Z"}]}),
    );
    push_file(&first, &db_path).unwrap();
    push_file(&stale, &db_path).unwrap();

    let conflicts = list_sync_conflicts(10, &db_path).unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].collection, "yards");
    assert_eq!(
        conflicts[0].incoming_updated_at.as_deref(),
        Some("2000-01-01T00:00:00.000Z")
    );

    assert!(matches!(
        list_sync_conflicts(0, &db_path),
        Err(CliError::EmptyLimit)
    ));
}

#[test]
fn format_sync_conflict_lines_handles_missing_timestamps() {
    let conflict = SyncConflict {
        id: 1,
        collection: "tasks".to_string(),
        record_id: 5,
        server_updated_at: Some("2024-05-02T00:00:00.000Z".to_string()),
        incoming_updated_at: None,
        resolved_at: "2024-05-03T00:00:00.000Z".to_string(),
        strategy: "lww".to_string(),
    };

    assert_eq!(
        format_sync_conflict_lines(&[conflict]),
        vec![
            "2024-05-03T00:00:00.000Z  lww   tasks#5  server=2024-05-02T00:00:00.000Z incoming=-"
                .to_string()
        ]
    );
}
