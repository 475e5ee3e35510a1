//! Scoped database state: suspended foreign-key enforcement and read
//! transactions

use crate::database::{Database, DbResult};

/// Disables foreign-key checks on creation and puts back the previous state
/// when dropped, on every exit path.
pub struct ForeignKeyGuard<'a, D: Database + ?Sized> {
    db: &'a D,
    previous: bool,
}

impl<'a, D: Database + ?Sized> ForeignKeyGuard<'a, D> {
    pub fn disable(db: &'a D) -> DbResult<Self> {
        let previous = db.foreign_key_checks()?;
        db.set_foreign_key_checks(false)?;
        tracing::debug!(previous, "Foreign key checks suspended");
        Ok(Self { db, previous })
    }

    /// State that will be restored on drop.
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl<D: Database + ?Sized> Drop for ForeignKeyGuard<'_, D> {
    fn drop(&mut self) {
        match self.db.set_foreign_key_checks(self.previous) {
            Ok(()) => tracing::debug!(enabled = self.previous, "Foreign key checks restored"),
            Err(e) => tracing::error!(
                error = %e,
                enabled = self.previous,
                "Failed to restore foreign key checks"
            ),
        }
    }
}

/// Holds a read transaction open until dropped, so every read made through
/// the handle in between sees the same committed state.
pub struct ReadTransaction<'a, D: Database + ?Sized> {
    db: &'a D,
}

impl<'a, D: Database + ?Sized> ReadTransaction<'a, D> {
    pub fn begin(db: &'a D) -> DbResult<Self> {
        db.begin_read()?;
        tracing::debug!("Read transaction started");
        Ok(Self { db })
    }
}

impl<D: Database + ?Sized> Drop for ReadTransaction<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.db.end_read() {
            tracing::error!(error = %e, "Failed to end read transaction");
        }
    }
}
