//! Sync batch wire envelope

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::EntityRecord;
use crate::registry::{self, CollectionSpec};
use crate::timestamp::Timestamp;

/// Key carrying the watermark in pull responses; ignored when pushed back
pub const SYNCED_AT_FIELD: &str = "syncedAt";

/// Per-collection record sets for pull responses and push requests
///
/// Serializes as `{ settings: Record|null, <collection>: Record[], ... }` with every
/// registered keyed collection present, in registry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncBatch {
    settings: Option<EntityRecord>,
    collections: BTreeMap<&'static str, Vec<EntityRecord>>,
}

impl SyncBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn settings(&self) -> Option<&EntityRecord> {
        self.settings.as_ref()
    }

    pub fn set_settings(&mut self, settings: Option<EntityRecord>) {
        self.settings = settings;
    }

    /// Records of a keyed collection; empty when the batch carries none
    pub fn records(&self, collection: &str) -> &[EntityRecord] {
        self.collections
            .get(collection)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Replace the records of a keyed collection
    pub fn set_records(&mut self, collection: &str, records: Vec<EntityRecord>) -> Result<()> {
        let spec = keyed_spec(collection)?;
        self.collections.insert(spec.name, records);
        Ok(())
    }

    /// Builder-style variant of [`Self::set_records`]
    pub fn with_records(mut self, collection: &str, records: Vec<EntityRecord>) -> Result<Self> {
        self.set_records(collection, records)?;
        Ok(self)
    }

    /// Builder-style variant of [`Self::set_settings`]
    #[must_use]
    pub fn with_settings(mut self, settings: EntityRecord) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Total number of records carried, singleton included
    pub fn len(&self) -> usize {
        usize::from(self.settings.is_some()) + self.collections.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate and convert a decoded JSON body
    ///
    /// The body must be an object. `settings` must be an object or null; every registered
    /// keyed collection must be an array of objects. `syncedAt` and unknown keys are
    /// ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidInput(
                "sync batch must be a JSON object".to_string(),
            ));
        };

        let mut batch = Self::new();
        for (key, value) in map {
            if key == SYNCED_AT_FIELD {
                continue;
            }
            let Some(spec) = registry::lookup(&key) else {
                tracing::debug!(collection = %key, "Ignoring unregistered collection in batch");
                continue;
            };

            if spec.is_singleton() {
                batch.settings = match value {
                    Value::Null => None,
                    other => Some(EntityRecord::try_from(other).map_err(|_| {
                        Error::InvalidInput(format!("{} must be an object or null", spec.name))
                    })?),
                };
                continue;
            }

            let Value::Array(items) = value else {
                return Err(Error::InvalidInput(format!(
                    "{} must be an array of records",
                    spec.name
                )));
            };
            let records = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    EntityRecord::try_from(item).map_err(|_| {
                        Error::InvalidInput(format!("{}[{index}] must be an object", spec.name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            batch.collections.insert(spec.name, records);
        }

        Ok(batch)
    }
}

fn keyed_spec(collection: &str) -> Result<&'static CollectionSpec> {
    registry::lookup(collection)
        .filter(|spec| !spec.is_singleton())
        .ok_or_else(|| Error::UnknownCollection(collection.to_string()))
}

impl Serialize for SyncBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(registry::REGISTRY.len()))?;
        map.serialize_entry(registry::SETTINGS, &self.settings)?;
        for spec in registry::keyed() {
            map.serialize_entry(spec.name, self.records(spec.name))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SyncBatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

/// Pull result: the change set plus the watermark for the next pull
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullResponse {
    #[serde(rename = "syncedAt")]
    pub synced_at: Timestamp,
    #[serde(flatten)]
    pub batch: SyncBatch,
}
