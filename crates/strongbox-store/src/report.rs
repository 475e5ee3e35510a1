//! Outcome of a restore, per table
//!
//! Restores are best effort, so a successful call can still leave tables
//! or rows behind. The report lists each unit so that an operator can
//! rerun a selective restore for exactly the tables that need it.

use serde::Serialize;
use std::collections::BTreeMap;

use strongbox_core::RecoveredFailure;

/// Failure messages kept per table; further failures are only counted.
pub const MAX_RECORDED_FAILURES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    Full,
    Selective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOutcome {
    /// Every row was inserted.
    Restored,
    /// Some rows were inserted, some failed.
    Partial,
    /// The table was emptied or could not be emptied, and no row went in.
    Failed,
    /// The table was left untouched.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The snapshot holds no rows for the table.
    Empty,
    /// The table failed to dump at backup time.
    ErrorMarker,
    /// The live database has no such table.
    NotInLiveSchema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub kind: RecoveredFailure,
    /// Index of the row within the snapshot table, for row failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub outcome: TableOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub rows_inserted: u64,
    pub rows_failed: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UnitFailure>,
}

impl TableReport {
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            outcome: TableOutcome::Skipped,
            skip_reason: Some(reason),
            rows_inserted: 0,
            rows_failed: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn table_failed(message: String) -> Self {
        Self {
            outcome: TableOutcome::Failed,
            skip_reason: None,
            rows_inserted: 0,
            rows_failed: 0,
            failures: vec![UnitFailure {
                kind: RecoveredFailure::PerTableFailure,
                row: None,
                message,
            }],
        }
    }

    pub(crate) fn started() -> Self {
        Self {
            outcome: TableOutcome::Restored,
            skip_reason: None,
            rows_inserted: 0,
            rows_failed: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_row_failure(&mut self, row: usize, message: String) {
        self.rows_failed += 1;
        if self.failures.len() < MAX_RECORDED_FAILURES {
            self.failures.push(UnitFailure {
                kind: RecoveredFailure::PerRowFailure,
                row: Some(row),
                message,
            });
        }
    }

    /// Settle the outcome once every row has been attempted.
    pub(crate) fn finish(mut self) -> Self {
        self.outcome = match (self.rows_inserted, self.rows_failed) {
            (_, 0) => TableOutcome::Restored,
            (0, _) => TableOutcome::Failed,
            _ => TableOutcome::Partial,
        };
        self
    }

    /// Whether rerunning this table could change the database.
    pub fn needs_attention(&self) -> bool {
        matches!(self.outcome, TableOutcome::Partial | TableOutcome::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub mode: RestoreMode,
    pub tables: BTreeMap<String, TableReport>,
}

impl RestoreReport {
    pub fn new(mode: RestoreMode) -> Self {
        Self {
            mode,
            tables: BTreeMap::new(),
        }
    }

    pub fn rows_inserted(&self) -> u64 {
        self.tables.values().map(|t| t.rows_inserted).sum()
    }

    pub fn rows_failed(&self) -> u64 {
        self.tables.values().map(|t| t.rows_failed).sum()
    }

    /// Tables with at least one failure, to feed into a selective rerun.
    pub fn tables_needing_attention(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|(_, report)| report.needs_attention())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.tables.values().all(|t| !t.needs_attention())
    }
}
