//! Read-only comparison of a snapshot against the live database

use serde::Serialize;
use std::collections::BTreeMap;

use strongbox_core::{Row, Snapshot, TableData};

use crate::database::Database;

/// Rows of each table included in a preview.
pub const SAMPLE_SIZE: usize = 5;

/// Per-table preview figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewStat {
    /// Rows the snapshot would write.
    pub incoming: usize,
    /// Rows currently in the live table, `None` when counting failed.
    pub existing: Option<u64>,
    pub sample: Vec<Row>,
    /// Error marker recorded at backup time, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type Preview = BTreeMap<String, PreviewStat>;

/// Computes row-count deltas without mutating anything.
///
/// Only [`Database::count_rows`] is ever called.
pub struct PreviewEngine<'a, D: Database + ?Sized> {
    db: &'a D,
}

impl<'a, D: Database + ?Sized> PreviewEngine<'a, D> {
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    pub fn preview(&self, snapshot: &Snapshot) -> Preview {
        snapshot
            .data
            .iter()
            .map(|(table, data)| (table.clone(), self.table_stat(table, data)))
            .collect()
    }

    fn table_stat(&self, table: &str, data: &TableData) -> PreviewStat {
        let existing = match self.db.count_rows(table) {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(table, error = %e, "Could not count live rows for preview");
                None
            }
        };

        let rows = data.rows().unwrap_or_default();
        PreviewStat {
            incoming: rows.len(),
            existing,
            sample: rows.iter().take(SAMPLE_SIZE).cloned().collect(),
            error: data.error().map(str::to_string),
        }
    }
}
