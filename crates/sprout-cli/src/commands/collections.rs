use std::path::Path;

use sprout_core::db::Database;
use sprout_core::registry::{self, CollectionKind};

use crate::error::CliError;

#[derive(Debug, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: &'static str,
    pub table: &'static str,
    pub kind: CollectionKind,
    pub depends_on: &'static [&'static str],
    pub rows: usize,
}

pub fn collection_summaries(db_path: &Path) -> Result<Vec<CollectionSummary>, CliError> {
    let db = Database::open(db_path)?;
    registry::REGISTRY
        .iter()
        .map(|spec| -> Result<CollectionSummary, CliError> {
            Ok(CollectionSummary {
                name: spec.name,
                table: spec.table,
                kind: spec.kind,
                depends_on: spec.depends_on,
                rows: db.collection(spec).count()?,
            })
        })
        .collect()
}

pub fn run_collections(db_path: &Path) -> Result<(), CliError> {
    for line in format_collection_lines(&collection_summaries(db_path)?) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_collection_lines(summaries: &[CollectionSummary]) -> Vec<String> {
    summaries
        .iter()
        .map(|summary| {
            let kind = match summary.kind {
                CollectionKind::Singleton => "singleton",
                CollectionKind::Keyed => "keyed",
            };
            let mut line = format!(
                "{:<16} {:<16} {:<9} rows={}",
                summary.name, summary.table, kind, summary.rows
            );
            if !summary.depends_on.is_empty() {
                line.push_str("  after=");
                line.push_str(&summary.depends_on.join(","));
            }
            line
        })
        .collect()
}
