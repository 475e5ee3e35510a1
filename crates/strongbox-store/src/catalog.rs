//! Live schema discovery

use crate::database::{Database, DbResult};

/// Lists the tables present in the live database at call time.
pub struct TableCatalog<'a, D: Database + ?Sized> {
    db: &'a D,
}

impl<'a, D: Database + ?Sized> TableCatalog<'a, D> {
    pub fn new(db: &'a D) -> Self {
        Self { db }
    }

    /// Table names, sorted so that repeated calls against an unchanged
    /// schema yield the same sequence.
    pub fn discover(&self) -> DbResult<Vec<String>> {
        let mut tables = self.db.list_tables()?;
        tables.sort();
        tables.dedup();
        tracing::debug!(tables = tables.len(), "Discovered tables");
        Ok(tables)
    }
}
