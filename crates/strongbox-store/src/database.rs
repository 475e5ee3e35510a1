//! Database collaborator interface
//!
//! The engine never builds SQL against a concrete driver. Everything it
//! needs from the live database is captured by [`Database`]: listing
//! tables, reading and counting rows, emptying a table, inserting one row
//! with named columns, toggling referential-integrity checks, and holding a
//! read transaction across a dump.

use std::fmt;

use strongbox_core::{BackupError, Row};

/// Database operations the engine performs, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbOperation {
    Connect,
    ListTables,
    Select,
    Count,
    Truncate,
    Insert,
    ForeignKeys,
    Schema,
    Transaction,
}

impl fmt::Display for DbOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbOperation::Connect => "connect",
            DbOperation::ListTables => "list tables",
            DbOperation::Select => "select",
            DbOperation::Count => "count",
            DbOperation::Truncate => "truncate",
            DbOperation::Insert => "insert",
            DbOperation::ForeignKeys => "foreign key toggle",
            DbOperation::Schema => "inspect schema",
            DbOperation::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// A failed database call, with a message safe to show to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {details}")]
pub struct DbError {
    pub operation: DbOperation,
    pub details: String,
}

impl DbError {
    pub fn new(operation: DbOperation, details: impl Into<String>) -> Self {
        Self {
            operation,
            details: details.into(),
        }
    }
}

impl From<DbError> for BackupError {
    fn from(error: DbError) -> Self {
        BackupError::Database {
            operation: error.operation.to_string(),
            details: error.details,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// The primitives the backup engine needs from a relational database.
///
/// Implementations must parameterize every value and quote every
/// identifier they receive; table and column names originate from backup
/// artifacts. Foreign-key state is expected to be scoped to the handle the
/// trait is implemented on, so one handle must be used for a whole restore.
pub trait Database {
    /// Names of all user tables, in a stable order.
    fn list_tables(&self) -> DbResult<Vec<String>>;

    /// Every row of `table`, in storage order. Columns the database
    /// computes itself are left out, since they cannot be written back.
    fn fetch_rows(&self, table: &str) -> DbResult<Vec<Row>>;

    fn count_rows(&self, table: &str) -> DbResult<u64>;

    /// Remove every row of `table`.
    fn truncate(&self, table: &str) -> DbResult<()>;

    /// Insert the values of `row` for `columns`, in that order.
    fn insert_row(&self, table: &str, columns: &[String], row: &Row) -> DbResult<()>;

    fn foreign_key_checks(&self) -> DbResult<bool>;

    fn set_foreign_key_checks(&self, enabled: bool) -> DbResult<()>;

    /// Other tables whose rows change as a side effect of deleting rows
    /// from `table` (`ON DELETE CASCADE`, `SET NULL` or `SET DEFAULT`).
    fn cascading_dependents(&self, table: &str) -> DbResult<Vec<String>>;

    /// Start a read transaction so that later reads share one point in time.
    fn begin_read(&self) -> DbResult<()>;

    fn end_read(&self) -> DbResult<()>;
}

/// Quote an identifier for use in SQL, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
