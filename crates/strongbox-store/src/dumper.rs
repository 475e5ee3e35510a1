//! Snapshot every discovered table
//!
//! A table that cannot be read is recorded with an error marker so that
//! the snapshot still accounts for it; the rest of the dump carries on.
//! All tables are read inside one read transaction, so a dump taken while
//! the application writes is still a single point in time.

use chrono::Utc;

use strongbox_core::{BackupResult, RecoveredFailure, Snapshot, TableData};

use crate::catalog::TableCatalog;
use crate::database::Database;
use crate::guard::ReadTransaction;

pub struct Dumper<'a, D: Database + ?Sized> {
    db: &'a D,
}

impl<'a, D: Database + ?Sized> Dumper<'a, D> {
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    /// Read one table, turning a read failure into an error marker.
    pub fn dump_table(&self, table: &str) -> TableData {
        match self.db.fetch_rows(table) {
            Ok(rows) => {
                tracing::debug!(table, rows = rows.len(), "Dumped table");
                TableData::Rows(rows)
            }
            Err(e) => {
                tracing::warn!(
                    table,
                    failure = %RecoveredFailure::PerTableFailure,
                    error = %e,
                    "Table could not be dumped; recording error marker"
                );
                TableData::failed(e.details)
            }
        }
    }

    /// Dump every table the catalog reports.
    ///
    /// Only a failure to list the schema aborts the dump.
    pub fn dump_all(&self) -> BackupResult<Snapshot> {
        let _read = ReadTransaction::begin(self.db)?;
        let tables = TableCatalog::new(self.db).discover()?;
        let mut snapshot = Snapshot::new(Utc::now());

        for table in tables {
            let data = self.dump_table(&table);
            snapshot.insert_table(table, data);
        }

        tracing::info!(
            tables = snapshot.data.len(),
            failed_tables = snapshot.failed_tables(),
            "Database dump complete"
        );
        Ok(snapshot)
    }
}
