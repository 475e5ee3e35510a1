//! SQLite binding for the backup engine
//!
//! - Thread-safe connection pooling with WAL mode
//! - [`Database`](crate::Database) implemented directly on
//!   [`rusqlite::Connection`], so a pooled connection can be handed to the
//!   dumper and restorers as-is

use std::path::Path;
use std::sync::Arc;

mod connection;
pub mod pool;
pub(crate) mod value;

pub use pool::{PoolHealth, PooledConnection, SqlitePool};
pub use value::{BLOB_KEY, TEXT_BYTES_KEY};

use crate::database::DbResult;

/// Longest database message passed through to callers.
const MAX_ERROR_MESSAGE_LENGTH: usize = 200;

/// Pooled handle to one SQLite database file
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: Arc<SqlitePool>,
}

impl SqliteDatabase {
    pub fn open(path: impl AsRef<Path>, pool_size: usize) -> DbResult<Self> {
        let pool = SqlitePool::new(path, pool_size)?;
        tracing::info!(
            path = %pool.path().display(),
            pool_size,
            "Opened SQLite database"
        );
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Check out a connection. Every call of one backup or restore must go
    /// through the same connection.
    pub fn acquire(&self) -> DbResult<PooledConnection> {
        self.pool.acquire()
    }

    /// Canonical path of the database file, used to key restore locks.
    pub fn path(&self) -> &Path {
        self.pool.path()
    }

    pub fn health(&self) -> DbResult<PoolHealth> {
        self.pool.health_check()
    }
}

/// Error text that is safe to put in reports and API responses
pub(crate) fn sanitize_error(error: &rusqlite::Error) -> String {
    let message = match error {
        rusqlite::Error::QueryReturnedNoRows => "No rows returned".to_string(),
        rusqlite::Error::InvalidColumnIndex(_) => "Invalid column index".to_string(),
        rusqlite::Error::InvalidColumnName(_) => "Invalid column name".to_string(),
        rusqlite::Error::InvalidPath(_) => "Invalid database path".to_string(),
        rusqlite::Error::InvalidColumnType(_, _, _) => "Invalid column type".to_string(),
        rusqlite::Error::IntegralValueOutOfRange(_, _) => "Value out of range".to_string(),
        rusqlite::Error::SqliteFailure(code, Some(message)) => {
            format!("{} ({:?})", message, code.code)
        }
        rusqlite::Error::SqliteFailure(code, None) => format!("{:?}", code.code),
        other => other.to_string(),
    };
    truncate_message(message)
}

fn truncate_message(message: String) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_LENGTH {
        return message;
    }
    let mut truncated: String = message.chars().take(MAX_ERROR_MESSAGE_LENGTH - 3).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_sqlite_message() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let error = conn.execute("SELECT * FROM missing", []).unwrap_err();
        let message = sanitize_error(&error);
        assert!(message.contains("no such table: missing"));
    }

    #[test]
    fn test_sanitize_truncates_long_messages() {
        let long = "x".repeat(500);
        let truncated = truncate_message(long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_MESSAGE_LENGTH);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_open_and_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::open(dir.path().join("open.db"), 2).unwrap();
        {
            let _conn = db.acquire().unwrap();
            assert_eq!(db.health().unwrap().checked_out, 1);
        }
        assert_eq!(db.health().unwrap().checked_out, 0);
        assert!(db.path().is_absolute());
    }
}
