//! Database connection management

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;

use super::collection::TableStore;
use super::conflict_log::ConflictLog;
use super::migrations;
use crate::error::{Error, Result};
use crate::registry::{self, CollectionSpec};

/// `SQLite` store shared by every request
///
/// The connection lock is taken per statement, never across a whole sync batch.
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open a database file at the given path, creating it and its parent directory if needed
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::initialize(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, None)
    }

    fn initialize(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        Self::configure(&conn)?;
        migrations::run(&conn)?;
        tracing::debug!(
            path = %path.as_deref().map_or_else(|| ":memory:".into(), Path::to_string_lossy),
            "Database ready"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Configure `SQLite` pragmas
    fn configure(conn: &Connection) -> Result<()> {
        // WAL is unavailable for in-memory databases; the pragma then reports "memory"
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .ok();
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    }

    /// Run a closure against the connection while holding the lock
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Database("connection lock poisoned".to_string()))?;
        f(&conn)
    }

    /// Typed handle for one registered collection
    pub const fn collection(&self, spec: &'static CollectionSpec) -> TableStore<'_> {
        TableStore::new(self, spec)
    }

    /// Typed handle for a collection looked up by wire name
    pub fn collection_named(&self, name: &str) -> Result<TableStore<'_>> {
        registry::lookup(name)
            .map(|spec| self.collection(spec))
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))
    }

    /// Log of rejected incoming writes
    pub const fn conflicts(&self) -> ConflictLog<'_> {
        ConflictLog::new(self)
    }

    /// Filesystem location, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
