//! Entity record model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::registry::CollectionSpec;
use crate::timestamp::Timestamp;

/// Store-assigned identity of a record within its collection
pub type RecordId = i64;

/// A synchronized row: field name to JSON value
///
/// Always carries `id` and `updatedAt` once it has been written by the store; incoming
/// records may lack either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRecord(Map<String, Value>);

impl EntityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record's id; `None` when absent or null
    ///
    /// Fails for ids that are not integers.
    pub fn id(&self) -> Result<Option<RecordId>> {
        match self.0.get(CollectionSpec::ID_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => number
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::InvalidInput(format!("id must be an integer, got {number}"))),
            Some(other) => Err(Error::InvalidInput(format!(
                "id must be an integer, got {other}"
            ))),
        }
    }

    /// The record's `updatedAt` in canonical form; `None` when absent or null
    ///
    /// Fails for values that are not RFC 3339 strings.
    pub fn checked_updated_at(&self) -> Result<Option<Timestamp>> {
        match self.0.get(CollectionSpec::UPDATED_AT_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Timestamp::parse(text).map(Some),
            Some(other) => Err(Error::InvalidInput(format!(
                "updatedAt must be an ISO-8601 string, got {other}"
            ))),
        }
    }

    /// Lenient variant of [`Self::checked_updated_at`]; malformed values count as missing
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.checked_updated_at().ok().flatten()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Builder-style field setter
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for EntityRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for EntityRecord {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidInput(format!(
                "record must be a JSON object, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> EntityRecord {
        EntityRecord::try_from(value).unwrap()
    }

    #[test]
    fn test_id_variants() {
        assert_eq!(record(json!({"id": 5})).id().unwrap(), Some(5));
        assert_eq!(record(json!({"id": null})).id().unwrap(), None);
        assert_eq!(record(json!({"title": "x"})).id().unwrap(), None);
        assert!(record(json!({"id": "5"})).id().is_err());
        assert!(record(json!({"id": 1.5})).id().is_err());
    }

    #[test]
    fn test_updated_at_is_canonicalized() {
        let stamped = record(json!({"updatedAt": "2024-05-01T02:00:00+02:00"}));
        assert_eq!(
            stamped.updated_at(),
            Some(Timestamp::from_stored("2024-05-01T00:00:00.000Z"))
        );
        assert_eq!(record(json!({"updatedAt": null})).checked_updated_at().unwrap(), None);
        assert_eq!(record(json!({})).checked_updated_at().unwrap(), None);
    }

    #[test]
    fn test_malformed_updated_at() {
        let numeric = record(json!({"updatedAt": 1_714_521_600}));
        assert!(numeric.checked_updated_at().is_err());
        assert_eq!(numeric.updated_at(), None);

        let garbage = record(json!({"updatedAt": "last week"}));
        assert!(garbage.checked_updated_at().is_err());
        assert_eq!(garbage.updated_at(), None);
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(EntityRecord::try_from(json!([1, 2])).is_err());
        assert!(EntityRecord::try_from(json!("task")).is_err());
    }

    #[test]
    fn test_builder_serializes_as_plain_object() {
        let task = EntityRecord::new().with("id", 5).with("title", "Water bed");
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({"id": 5, "title": "Water bed"})
        );
    }
}
