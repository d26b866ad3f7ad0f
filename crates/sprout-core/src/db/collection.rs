//! Typed collection handles over the registry's tables

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, OptionalExtension, Row};
use serde_json::{Number, Value};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{EntityRecord, RecordId};
use crate::registry::{CollectionSpec, ColumnKind, ColumnSpec};
use crate::timestamp::{older_than_sql, Timestamp};

/// Storage operations the sync engine needs from one collection
pub trait CollectionStore {
    /// The registry entry this store serves
    fn spec(&self) -> &'static CollectionSpec;

    /// Records with `updatedAt` strictly after `since`, or every record when `since` is
    /// `None`, ordered by id
    fn list_since(&self, since: Option<&Timestamp>) -> Result<Vec<EntityRecord>>;

    /// Get a record by ID
    fn get_by_id(&self, id: RecordId) -> Result<Option<EntityRecord>>;

    /// The record with the lowest id
    fn first(&self) -> Result<Option<EntityRecord>>;

    /// Insert a record stamped with `stamp`
    ///
    /// Uses the record's id when it carries one, otherwise lets the store assign it.
    /// Returns `None` without writing when a row with that id already exists.
    fn insert(&self, record: &EntityRecord, stamp: &Timestamp) -> Result<Option<RecordId>>;

    /// Overwrite the fields `record` carries (never `id`) and restamp `updatedAt`
    ///
    /// The write only happens if the stored row is still older than `incoming` under the
    /// timestamp ordering, checked atomically by the statement itself. Returns whether a
    /// row was written.
    fn update(
        &self,
        id: RecordId,
        record: &EntityRecord,
        stamp: &Timestamp,
        incoming: Option<&Timestamp>,
    ) -> Result<bool>;
}

/// `SQLite` implementation of `CollectionStore` for one registered table
#[derive(Clone, Copy)]
pub struct TableStore<'a> {
    db: &'a Database,
    spec: &'static CollectionSpec,
}

impl<'a> TableStore<'a> {
    /// Create a store for the given registry entry
    pub const fn new(db: &'a Database, spec: &'static CollectionSpec) -> Self {
        Self { db, spec }
    }

    /// Parse a record from a row selected with [`CollectionSpec::select_list`]
    fn parse_record(&self, row: &Row<'_>) -> rusqlite::Result<EntityRecord> {
        let mut record = EntityRecord::new();
        record.insert(
            CollectionSpec::ID_FIELD,
            Value::from(row.get::<_, RecordId>(0)?),
        );
        for (offset, column) in self.spec.columns.iter().enumerate() {
            let value = sql_to_json(column.kind, row.get_ref(offset + 1)?);
            record.insert(column.field, value);
        }
        let updated_at: Option<String> = row.get(self.spec.columns.len() + 1)?;
        record.insert(
            CollectionSpec::UPDATED_AT_FIELD,
            updated_at.map_or(Value::Null, Value::String),
        );
        Ok(record)
    }

    /// Registered columns the record carries, converted for binding
    fn bound_columns(&self, record: &EntityRecord) -> Result<Vec<(&'static str, SqlValue)>> {
        let mut bound = Vec::new();
        for (field, value) in record.fields() {
            if field == CollectionSpec::ID_FIELD || field == CollectionSpec::UPDATED_AT_FIELD {
                continue;
            }
            let Some(column) = self.spec.column_for_field(field) else {
                tracing::trace!(collection = self.spec.name, field, "Ignoring unknown field");
                continue;
            };
            bound.push((column.column, json_to_sql(self.spec, column, value)?));
        }
        Ok(bound)
    }

    /// Number of rows in the table
    #[allow(clippy::cast_sign_loss)]
    pub fn count(&self) -> Result<usize> {
        self.db.with_connection(|conn| {
            let sql = format!("SELECT COUNT(*) FROM {}", self.spec.table);
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn select_where(&self, clause: &str) -> String {
        format!(
            "SELECT {} FROM {} {clause}",
            self.spec.select_list(),
            self.spec.table
        )
    }
}

impl CollectionStore for TableStore<'_> {
    fn spec(&self) -> &'static CollectionSpec {
        self.spec
    }

    fn list_since(&self, since: Option<&Timestamp>) -> Result<Vec<EntityRecord>> {
        self.db.with_connection(|conn| {
            let sql = if since.is_some() {
                self.select_where("WHERE updated_at > ? ORDER BY id")
            } else {
                self.select_where("ORDER BY id")
            };
            let params: Vec<&str> = since.map(Timestamp::as_str).into_iter().collect();

            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params_from_iter(params), |row| self.parse_record(row))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    fn get_by_id(&self, id: RecordId) -> Result<Option<EntityRecord>> {
        self.db.with_connection(|conn| {
            let sql = self.select_where("WHERE id = ?");
            let record = conn
                .query_row(&sql, [id], |row| self.parse_record(row))
                .optional()?;
            Ok(record)
        })
    }

    fn first(&self) -> Result<Option<EntityRecord>> {
        self.db.with_connection(|conn| {
            let sql = self.select_where("ORDER BY id LIMIT 1");
            let record = conn
                .query_row(&sql, [], |row| self.parse_record(row))
                .optional()?;
            Ok(record)
        })
    }

    fn insert(&self, record: &EntityRecord, stamp: &Timestamp) -> Result<Option<RecordId>> {
        let id = record.id()?;
        let mut columns = Vec::new();
        let mut values = Vec::new();
        if let Some(id) = id {
            columns.push(CollectionSpec::ID_COLUMN);
            values.push(SqlValue::Integer(id));
        }
        for (column, value) in self.bound_columns(record)? {
            columns.push(column);
            values.push(value);
        }
        columns.push(CollectionSpec::UPDATED_AT_COLUMN);
        values.push(SqlValue::Text(stamp.as_str().to_string()));

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders}) ON CONFLICT(id) DO NOTHING",
            self.spec.table,
            columns.join(", ")
        );

        self.db.with_connection(|conn| {
            let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
            if changed == 0 {
                return Ok(None);
            }
            Ok(Some(id.unwrap_or_else(|| conn.last_insert_rowid())))
        })
    }

    fn update(
        &self,
        id: RecordId,
        record: &EntityRecord,
        stamp: &Timestamp,
        incoming: Option<&Timestamp>,
    ) -> Result<bool> {
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (column, value) in self.bound_columns(record)? {
            assignments.push(format!("{column} = ?"));
            values.push(value);
        }
        assignments.push(format!("{} = ?", CollectionSpec::UPDATED_AT_COLUMN));
        values.push(SqlValue::Text(stamp.as_str().to_string()));
        values.push(SqlValue::Integer(id));

        let (guard, guard_value) = older_than_sql(CollectionSpec::UPDATED_AT_COLUMN, incoming);
        if let Some(guard_value) = guard_value {
            values.push(SqlValue::Text(guard_value));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ? AND {guard}",
            self.spec.table,
            assignments.join(", ")
        );

        self.db.with_connection(|conn| {
            let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
            Ok(changed > 0)
        })
    }
}

/// Convert an incoming JSON value to the column's storage type
fn json_to_sql(spec: &CollectionSpec, column: &ColumnSpec, value: &Value) -> Result<SqlValue> {
    let mismatch = || {
        Error::InvalidInput(format!(
            "{}.{} expects {:?}, got {value}",
            spec.name, column.field, column.kind
        ))
    };

    let converted = match (column.kind, value) {
        (_, Value::Null) => SqlValue::Null,
        (ColumnKind::Integer, Value::Number(number)) => {
            SqlValue::Integer(number.as_i64().ok_or_else(mismatch)?)
        }
        (ColumnKind::Real, Value::Number(number)) => {
            SqlValue::Real(number.as_f64().ok_or_else(mismatch)?)
        }
        (ColumnKind::Text, Value::String(text)) => SqlValue::Text(text.clone()),
        (ColumnKind::Boolean, Value::Bool(flag)) => SqlValue::Integer(i64::from(*flag)),
        (ColumnKind::Boolean, Value::Number(number)) => match number.as_i64() {
            Some(flag @ (0 | 1)) => SqlValue::Integer(flag),
            _ => return Err(mismatch()),
        },
        (ColumnKind::Json, other) => SqlValue::Text(serde_json::to_string(other)?),
        _ => return Err(mismatch()),
    };
    Ok(converted)
}

/// Convert a stored value back to its wire representation
fn sql_to_json(kind: ColumnKind, value: ValueRef<'_>) -> Value {
    match (kind, value) {
        (_, ValueRef::Null) => Value::Null,
        (ColumnKind::Boolean, ValueRef::Integer(flag)) => Value::Bool(flag != 0),
        (ColumnKind::Json, ValueRef::Text(text)) => {
            let text = String::from_utf8_lossy(text);
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned()))
        }
        (_, ValueRef::Integer(number)) => Value::from(number),
        (_, ValueRef::Real(number)) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        (_, ValueRef::Text(text)) => Value::String(String::from_utf8_lossy(text).into_owned()),
        (_, ValueRef::Blob(bytes)) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}
