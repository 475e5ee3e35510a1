//! Full and selective restore
//!
//! Both strategies share one primitive: empty the live table, then insert
//! every snapshot row using the first row's keys as the column list. The
//! decoder has already rejected tables whose rows disagree on columns.
//!
//! Restores are best effort. A failing row is logged and counted, a failing
//! table is logged and reported, and the run continues with the next unit.
//! Only problems that make the whole run meaningless (unreadable schema,
//! bad selection, foreign-key state that cannot be changed) are returned
//! as errors, and they are detected before anything is written.

use std::collections::{BTreeSet, HashSet};

use strongbox_core::{BackupError, BackupResult, RecoveredFailure, Row, Snapshot, TableData};

use crate::catalog::TableCatalog;
use crate::database::Database;
use crate::guard::ForeignKeyGuard;
use crate::report::{RestoreMode, RestoreReport, SkipReason, TableReport};

/// Truncate `table` and insert `rows` into it.
pub(crate) fn replace_table<D: Database + ?Sized>(
    db: &D,
    table: &str,
    rows: &[Row],
) -> TableReport {
    if let Err(e) = db.truncate(table) {
        tracing::warn!(
            table,
            failure = %RecoveredFailure::PerTableFailure,
            error = %e,
            "Could not empty table; leaving it as is"
        );
        return TableReport::table_failed(e.details);
    }

    let columns = rows
        .first()
        .map(|row| row.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    let mut report = TableReport::started();
    for (index, row) in rows.iter().enumerate() {
        match db.insert_row(table, &columns, row) {
            Ok(()) => report.rows_inserted += 1,
            Err(e) => {
                tracing::warn!(
                    table,
                    row = index,
                    failure = %RecoveredFailure::PerRowFailure,
                    error = %e,
                    "Row insert failed; skipping row"
                );
                report.record_row_failure(index, e.details);
            }
        }
    }

    let report = report.finish();
    tracing::info!(
        table,
        rows_inserted = report.rows_inserted,
        rows_failed = report.rows_failed,
        "Table restored"
    );
    report
}

/// Rows to write for one snapshot table, or the report explaining why the
/// table is skipped.
fn restorable_rows<'s>(
    live_tables: &HashSet<String>,
    table: &str,
    data: &'s TableData,
) -> Result<&'s [Row], TableReport> {
    let rows = match data {
        TableData::Failed { error } => {
            tracing::warn!(table, error = %error, "Snapshot holds an error marker; skipping table");
            return Err(TableReport::skipped(SkipReason::ErrorMarker));
        }
        TableData::Rows(rows) if rows.is_empty() => {
            tracing::debug!(table, "Snapshot table is empty; skipping");
            return Err(TableReport::skipped(SkipReason::Empty));
        }
        TableData::Rows(rows) => rows,
    };

    if !live_tables.contains(table) {
        tracing::warn!(table, "Table is not in the live schema; skipping");
        return Err(TableReport::skipped(SkipReason::NotInLiveSchema));
    }

    Ok(rows)
}

/// Refuse to empty `table` when deleting its rows would delete or rewrite
/// rows of another table.
fn ensure_no_cascade<D: Database + ?Sized>(db: &D, table: &str) -> Result<(), TableReport> {
    let dependents = match db.cascading_dependents(table) {
        Ok(dependents) => dependents,
        Err(e) => {
            tracing::warn!(
                table,
                failure = %RecoveredFailure::PerTableFailure,
                error = %e,
                "Could not inspect foreign keys; leaving table as is"
            );
            return Err(TableReport::table_failed(e.details));
        }
    };
    if dependents.is_empty() {
        return Ok(());
    }

    tracing::warn!(
        table,
        dependents = ?dependents,
        failure = %RecoveredFailure::PerTableFailure,
        "Emptying table would cascade into other tables; leaving it as is"
    );
    Err(TableReport::table_failed(format!(
        "emptying this table would cascade into: {}; use a full restore",
        dependents.join(", ")
    )))
}

fn live_tables<D: Database + ?Sized>(db: &D) -> BackupResult<HashSet<String>> {
    Ok(TableCatalog::new(db).discover()?.into_iter().collect())
}

/// Replaces the content of every table in a snapshot.
pub struct FullRestorer<'a, D: Database + ?Sized> {
    db: &'a D,
}

impl<'a, D: Database + ?Sized> FullRestorer<'a, D> {
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    /// Restore every table with foreign-key checks suspended for the run.
    pub fn restore_all(&self, snapshot: &Snapshot) -> BackupResult<RestoreReport> {
        let live = live_tables(self.db)?;
        let _fk_guard = ForeignKeyGuard::disable(self.db)?;

        let mut report = RestoreReport::new(RestoreMode::Full);
        for (table, data) in &snapshot.data {
            let unit = match restorable_rows(&live, table, data) {
                Ok(rows) => replace_table(self.db, table, rows),
                Err(skipped) => skipped,
            };
            report.tables.insert(table.clone(), unit);
        }

        tracing::info!(
            tables = report.tables.len(),
            rows_inserted = report.rows_inserted(),
            rows_failed = report.rows_failed(),
            needs_attention = ?report.tables_needing_attention(),
            "Full restore finished"
        );
        Ok(report)
    }
}

/// Check a selection against a snapshot without touching any database.
pub fn validate_selection(snapshot: &Snapshot, tables: &BTreeSet<String>) -> BackupResult<()> {
    check_selection(tables, |name| snapshot.table(name).is_some())
}

pub(crate) fn check_selection(
    tables: &BTreeSet<String>,
    in_backup: impl Fn(&str) -> bool,
) -> BackupResult<()> {
    if tables.is_empty() {
        return Err(BackupError::invalid_selection("no tables selected"));
    }

    let unknown: Vec<&str> = tables
        .iter()
        .map(String::as_str)
        .filter(|name| !in_backup(name))
        .collect();
    if !unknown.is_empty() {
        return Err(BackupError::invalid_selection(format!(
            "not in backup: {}",
            unknown.join(", ")
        )));
    }

    Ok(())
}

/// Restores a chosen subset of tables, leaving every other table and the
/// foreign-key setting alone.
///
/// A selected table that other tables reference with `ON DELETE CASCADE`,
/// `SET NULL` or `SET DEFAULT` is reported as failed and left untouched,
/// since emptying it would change rows outside the selection.
pub struct SelectiveRestorer<'a, D: Database + ?Sized> {
    db: &'a D,
}

impl<'a, D: Database + ?Sized> SelectiveRestorer<'a, D> {
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    pub fn restore_selected(
        &self,
        snapshot: &Snapshot,
        tables: &BTreeSet<String>,
    ) -> BackupResult<RestoreReport> {
        validate_selection(snapshot, tables)?;
        let live = live_tables(self.db)?;
        // Cascading actions only fire while enforcement is on
        let enforced = self.db.foreign_key_checks()?;

        let mut report = RestoreReport::new(RestoreMode::Selective);
        for table in tables {
            if let Some(data) = snapshot.table(table) {
                let checked = restorable_rows(&live, table, data).and_then(|rows| {
                    if enforced {
                        ensure_no_cascade(self.db, table)?;
                    }
                    Ok(rows)
                });
                let unit = match checked {
                    Ok(rows) => replace_table(self.db, table, rows),
                    Err(unit) => unit,
                };
                report.tables.insert(table.clone(), unit);
            }
        }

        tracing::info!(
            tables = report.tables.len(),
            rows_inserted = report.rows_inserted(),
            rows_failed = report.rows_failed(),
            "Selective restore finished"
        );
        Ok(report)
    }
}
