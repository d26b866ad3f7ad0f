//! Database migrations

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::registry::REGISTRY;

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }
    if version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Apply one migration's statements and record its version atomically
fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?)",
        params![version],
    )?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: synchronized collection tables
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            // Singleton; the sync engine reads the lowest id if more than one row exists
            "CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY,
                zip_code TEXT,
                hardiness_zone TEXT,
                last_frost_date TEXT,
                first_frost_date TEXT,
                gdd_base_temp REAL,
                temperature_unit TEXT,
                preferences TEXT,
                updated_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS yards (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                width REAL,
                height REAL,
                unit TEXT,
                notes TEXT,
                created_at TEXT,
                updated_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS yard_elements (
                id INTEGER PRIMARY KEY,
                yard_id INTEGER NOT NULL REFERENCES yards(id) ON DELETE CASCADE,
                shape_type TEXT NOT NULL DEFAULT 'rectangle',
                x REAL NOT NULL DEFAULT 0,
                y REAL NOT NULL DEFAULT 0,
                width REAL,
                height REAL,
                rotation REAL NOT NULL DEFAULT 0,
                label TEXT,
                sun_exposure TEXT,
                metadata TEXT,
                updated_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS plants (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                variety TEXT,
                category TEXT,
                days_to_maturity INTEGER,
                spacing_inches REAL,
                sun_requirement TEXT,
                is_custom INTEGER NOT NULL DEFAULT 0,
                companions TEXT,
                updated_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS plantings (
                id INTEGER PRIMARY KEY,
                plant_id INTEGER NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
                yard_element_id INTEGER REFERENCES yard_elements(id) ON DELETE SET NULL,
                status TEXT NOT NULL DEFAULT 'planned',
                planted_date TEXT,
                expected_harvest_date TEXT,
                quantity INTEGER,
                notes TEXT,
                updated_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                planting_id INTEGER REFERENCES plantings(id) ON DELETE SET NULL,
                title TEXT NOT NULL,
                description TEXT,
                due_date TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                recurrence TEXT,
                updated_at TEXT
            )",
            "CREATE TABLE IF NOT EXISTS journal_entries (
                id INTEGER PRIMARY KEY,
                planting_id INTEGER REFERENCES plantings(id) ON DELETE SET NULL,
                yard_element_id INTEGER REFERENCES yard_elements(id) ON DELETE SET NULL,
                entry_date TEXT,
                content TEXT NOT NULL DEFAULT '',
                photos TEXT,
                updated_at TEXT
            )",
        ],
    )
}

/// Migration to version 2: `updated_at` indexes for incremental pulls
fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements: Vec<String> = REGISTRY
        .iter()
        .map(|spec| {
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_updated_at ON {table}(updated_at)",
                table = spec.table
            )
        })
        .collect();
    let statements: Vec<&str> = statements.iter().map(String::as_str).collect();
    apply(conn, 2, &statements)
}

/// Migration to version 3: LWW conflict logging support
fn migrate_v3(conn: &Connection) -> Result<()> {
    apply(
        conn,
        CURRENT_VERSION,
        &[
            "CREATE TABLE IF NOT EXISTS sync_conflicts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                record_id INTEGER NOT NULL,
                server_updated_at TEXT,
                incoming_updated_at TEXT,
                resolved_at TEXT NOT NULL,
                strategy TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_record
                ON sync_conflicts(collection, record_id)",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at
                ON sync_conflicts(resolved_at DESC)",
        ],
    )
}
