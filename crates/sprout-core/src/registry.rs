//! Entity registry: the fixed catalog of synchronized collections
//!
//! Adding a synchronized collection means adding a [`CollectionSpec`] to [`REGISTRY`] and
//! its table to the migrations. Nothing is registered at runtime.

/// Wire name of the singleton settings collection
pub const SETTINGS: &str = "settings";

/// Whether a collection holds one logical record or many records addressed by id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Singleton,
    Keyed,
}

/// Storage type of a synchronized column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    /// Stored as 0/1, exposed as a JSON boolean
    Boolean,
    /// Arbitrary JSON stored as text
    Json,
}

/// Mapping between a wire field (camelCase) and a table column (`snake_case`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

const fn column(field: &'static str, column: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        field,
        column,
        kind,
    }
}

/// Declaration of one synchronized collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Name used as the key in sync batches
    pub name: &'static str,
    pub table: &'static str,
    pub kind: CollectionKind,
    /// Collections referenced by foreign keys; informational only
    pub depends_on: &'static [&'static str],
    /// Non-identity, non-timestamp columns
    pub columns: &'static [ColumnSpec],
}

impl CollectionSpec {
    pub const ID_FIELD: &'static str = "id";
    pub const ID_COLUMN: &'static str = "id";
    pub const UPDATED_AT_FIELD: &'static str = "updatedAt";
    pub const UPDATED_AT_COLUMN: &'static str = "updated_at";

    pub fn is_singleton(&self) -> bool {
        self.kind == CollectionKind::Singleton
    }

    /// Find the column backing a wire field
    pub fn column_for_field(&self, field: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|spec| spec.field == field)
    }

    /// Comma-separated select list: id, data columns, then `updated_at`
    pub(crate) fn select_list(&self) -> String {
        let mut columns = Vec::with_capacity(self.columns.len() + 2);
        columns.push(Self::ID_COLUMN);
        columns.extend(self.columns.iter().map(|spec| spec.column));
        columns.push(Self::UPDATED_AT_COLUMN);
        columns.join(", ")
    }
}

use ColumnKind::{Boolean, Integer, Json, Real, Text};

/// Every synchronized collection, singleton first, parents before children
pub static REGISTRY: &[CollectionSpec] = &[
    CollectionSpec {
        name: SETTINGS,
        table: "settings",
        kind: CollectionKind::Singleton,
        depends_on: &[],
        columns: &[
            column("zipCode", "zip_code", Text),
            column("hardinessZone", "hardiness_zone", Text),
            column("lastFrostDate", "last_frost_date", Text),
            column("firstFrostDate", "first_frost_date", Text),
            column("gddBaseTemp", "gdd_base_temp", Real),
            column("temperatureUnit", "temperature_unit", Text),
            column("preferences", "preferences", Json),
        ],
    },
    CollectionSpec {
        name: "yards",
        table: "yards",
        kind: CollectionKind::Keyed,
        depends_on: &[],
        columns: &[
            column("name", "name", Text),
            column("width", "width", Real),
            column("height", "height", Real),
            column("unit", "unit", Text),
            column("notes", "notes", Text),
            column("createdAt", "created_at", Text),
        ],
    },
    CollectionSpec {
        name: "yardElements",
        table: "yard_elements",
        kind: CollectionKind::Keyed,
        depends_on: &["yards"],
        columns: &[
            column("yardId", "yard_id", Integer),
            column("shapeType", "shape_type", Text),
            column("x", "x", Real),
            column("y", "y", Real),
            column("width", "width", Real),
            column("height", "height", Real),
            column("rotation", "rotation", Real),
            column("label", "label", Text),
            column("sunExposure", "sun_exposure", Text),
            column("metadata", "metadata", Json),
        ],
    },
    CollectionSpec {
        name: "plants",
        table: "plants",
        kind: CollectionKind::Keyed,
        depends_on: &[],
        columns: &[
            column("name", "name", Text),
            column("variety", "variety", Text),
            column("category", "category", Text),
            column("daysToMaturity", "days_to_maturity", Integer),
            column("spacingInches", "spacing_inches", Real),
            column("sunRequirement", "sun_requirement", Text),
            column("isCustom", "is_custom", Boolean),
            column("companions", "companions", Json),
        ],
    },
    CollectionSpec {
        name: "plantings",
        table: "plantings",
        kind: CollectionKind::Keyed,
        depends_on: &["plants", "yardElements"],
        columns: &[
            column("plantId", "plant_id", Integer),
            column("yardElementId", "yard_element_id", Integer),
            column("status", "status", Text),
            column("plantedDate", "planted_date", Text),
            column("expectedHarvestDate", "expected_harvest_date", Text),
            column("quantity", "quantity", Integer),
            column("notes", "notes", Text),
        ],
    },
    CollectionSpec {
        name: "tasks",
        table: "tasks",
        kind: CollectionKind::Keyed,
        depends_on: &["plantings"],
        columns: &[
            column("plantingId", "planting_id", Integer),
            column("title", "title", Text),
            column("description", "description", Text),
            column("dueDate", "due_date", Text),
            column("completed", "completed", Boolean),
            column("recurrence", "recurrence", Text),
        ],
    },
    CollectionSpec {
        name: "journalEntries",
        table: "journal_entries",
        kind: CollectionKind::Keyed,
        depends_on: &["plantings", "yardElements"],
        columns: &[
            column("plantingId", "planting_id", Integer),
            column("yardElementId", "yard_element_id", Integer),
            column("entryDate", "entry_date", Text),
            column("content", "content", Text),
            column("photos", "photos", Json),
        ],
    },
];

/// Look up a collection by wire name
pub fn lookup(name: &str) -> Option<&'static CollectionSpec> {
    REGISTRY.iter().find(|spec| spec.name == name)
}

/// The singleton collection
pub fn singleton() -> &'static CollectionSpec {
    &REGISTRY[0]
}

/// Keyed collections in registry order
pub fn keyed() -> impl Iterator<Item = &'static CollectionSpec> {
    REGISTRY.iter().filter(|spec| !spec.is_singleton())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_exactly_one_singleton() {
        let singletons: Vec<_> = REGISTRY.iter().filter(|spec| spec.is_singleton()).collect();
        assert_eq!(singletons.len(), 1);
        assert_eq!(singleton().name, SETTINGS);
    }

    #[test]
    fn test_names_and_tables_unique() {
        let names: HashSet<_> = REGISTRY.iter().map(|spec| spec.name).collect();
        let tables: HashSet<_> = REGISTRY.iter().map(|spec| spec.table).collect();
        assert_eq!(names.len(), REGISTRY.len());
        assert_eq!(tables.len(), REGISTRY.len());
    }

    #[test]
    fn test_dependencies_are_registered_earlier() {
        for (index, spec) in REGISTRY.iter().enumerate() {
            for dependency in spec.depends_on {
                let position = REGISTRY
                    .iter()
                    .position(|candidate| candidate.name == *dependency)
                    .unwrap_or_else(|| panic!("{} depends on unknown {dependency}", spec.name));
                assert!(position < index, "{} listed before {dependency}", spec.name);
            }
        }
    }

    #[test]
    fn test_reserved_fields_are_not_data_columns() {
        for spec in REGISTRY {
            assert!(spec.column_for_field(CollectionSpec::ID_FIELD).is_none());
            assert!(spec
                .column_for_field(CollectionSpec::UPDATED_AT_FIELD)
                .is_none());
        }
    }

    #[test]
    fn test_lookup_and_keyed_order() {
        assert_eq!(lookup("tasks").map(|spec| spec.table), Some("tasks"));
        assert!(lookup("notes").is_none());

        let keyed: Vec<_> = keyed().map(|spec| spec.name).collect();
        assert_eq!(
            keyed,
            vec![
                "yards",
                "yardElements",
                "plants",
                "plantings",
                "tasks",
                "journalEntries"
            ]
        );
    }

    #[test]
    fn test_select_list_shape() {
        let tasks = lookup("tasks").unwrap();
        assert_eq!(
            tasks.select_list(),
            "id, planting_id, title, description, due_date, completed, recurrence, updated_at"
        );
    }
}
