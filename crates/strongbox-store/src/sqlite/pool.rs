//! Connection pool for SQLite with thread-safe resource management

use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

use crate::database::{DbError, DbOperation, DbResult};

use super::sanitize_error;

/// Connection pool for SQLite with a fixed upper bound on open connections
pub struct SqlitePool {
    shared: Arc<PoolShared>,
    path: PathBuf,
    config: ConnectionConfig,
}

struct PoolShared {
    state: Mutex<PoolState>,
    returned: Condvar,
    max_size: usize,
}

struct PoolState {
    idle: Vec<Connection>,
    checked_out: usize,
}

/// Configuration for SQLite connections
#[derive(Debug, Clone)]
pub(crate) struct ConnectionConfig {
    pub(crate) wal_mode: bool,
    pub(crate) cache_size_kb: i32,
    pub(crate) busy_timeout_ms: u32,
    pub(crate) acquire_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            cache_size_kb: 16 * 1024,
            busy_timeout_ms: 5000,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone)]
pub struct PoolHealth {
    pub idle_connections: usize,
    pub checked_out: usize,
    pub max_size: usize,
    pub last_check: SystemTime,
}

impl SqlitePool {
    /// Validate the database path (no traversal components, SQLite extension)
    fn validate_database_path(path: &Path) -> DbResult<PathBuf> {
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(DbError::new(
                DbOperation::Connect,
                "Invalid database path: parent directory components are not allowed",
            ));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("db" | "sqlite" | "sqlite3") => {}
            _ => {
                return Err(DbError::new(
                    DbOperation::Connect,
                    "Invalid database path: only .db, .sqlite, and .sqlite3 files allowed",
                ));
            }
        }

        // Canonicalize when the file already exists so lock keys are stable
        Ok(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))
    }

    /// Open the pool. One connection is opened eagerly so that a bad path
    /// fails here rather than on first use.
    pub fn new(path: impl AsRef<Path>, max_size: usize) -> DbResult<Self> {
        Self::with_config(path, max_size, ConnectionConfig::default())
    }

    pub(crate) fn with_config(
        path: impl AsRef<Path>,
        max_size: usize,
        config: ConnectionConfig,
    ) -> DbResult<Self> {
        if max_size == 0 {
            return Err(DbError::new(
                DbOperation::Connect,
                "Pool size must be at least 1",
            ));
        }

        let path = Self::validate_database_path(path.as_ref())?;
        let first = Self::create_connection(&path, &config)?;
        let path = path.canonicalize().unwrap_or(path);

        Ok(Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    idle: vec![first],
                    checked_out: 0,
                }),
                returned: Condvar::new(),
                max_size,
            }),
            path,
            config,
        })
    }

    /// Canonical path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a new SQLite connection with WAL mode and sensible pragmas
    fn create_connection(path: &Path, config: &ConnectionConfig) -> DbResult<Connection> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::new(DbOperation::Connect, sanitize_error(&e)))?;

        let mut pragmas = Vec::new();
        if config.wal_mode {
            pragmas.push("PRAGMA journal_mode = WAL;".to_string());
        }
        pragmas.push("PRAGMA synchronous = NORMAL;".to_string());
        pragmas.push(format!("PRAGMA cache_size = -{};", config.cache_size_kb));
        pragmas.push(format!("PRAGMA busy_timeout = {};", config.busy_timeout_ms));
        pragmas.push("PRAGMA foreign_keys = ON;".to_string());

        conn.execute_batch(&pragmas.join("\n")).map_err(|e| {
            DbError::new(
                DbOperation::Connect,
                format!("Failed to configure SQLite: {}", sanitize_error(&e)),
            )
        })?;

        Ok(conn)
    }

    fn lock_state(&self) -> DbResult<MutexGuard<'_, PoolState>> {
        self.shared.state.lock().map_err(|e| {
            DbError::new(
                DbOperation::Connect,
                format!("Failed to lock connection pool: {}", e),
            )
        })
    }

    /// Get a connection, waiting for one to be returned if the pool is at capacity
    pub fn acquire(&self) -> DbResult<PooledConnection> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut state = self.lock_state()?;

        loop {
            if let Some(conn) = state.idle.pop() {
                state.checked_out += 1;
                return Ok(PooledConnection::new(conn, Arc::clone(&self.shared)));
            }

            if state.checked_out < self.shared.max_size {
                // Reserve the slot before releasing the lock to open the file
                state.checked_out += 1;
                drop(state);

                return match Self::create_connection(&self.path, &self.config) {
                    Ok(conn) => Ok(PooledConnection::new(conn, Arc::clone(&self.shared))),
                    Err(e) => {
                        if let Ok(mut state) = self.shared.state.lock() {
                            state.checked_out -= 1;
                        }
                        self.shared.returned.notify_one();
                        Err(e)
                    }
                };
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DbError::new(
                    DbOperation::Connect,
                    format!(
                        "Connection pool exhausted ({} connections in use)",
                        state.checked_out
                    ),
                ));
            }

            let (guard, _) = self
                .shared
                .returned
                .wait_timeout(state, deadline - now)
                .map_err(|e| {
                    DbError::new(
                        DbOperation::Connect,
                        format!("Failed to wait for connection pool: {}", e),
                    )
                })?;
            state = guard;
        }
    }

    /// Check pool occupancy
    pub fn health_check(&self) -> DbResult<PoolHealth> {
        let state = self.lock_state()?;
        Ok(PoolHealth {
            idle_connections: state.idle.len(),
            checked_out: state.checked_out,
            max_size: self.shared.max_size,
            last_check: SystemTime::now(),
        })
    }
}

/// RAII wrapper for pooled connections that returns the connection to the pool on drop
pub struct PooledConnection {
    connection: Option<Connection>,
    shared: Arc<PoolShared>,
}

impl PooledConnection {
    fn new(connection: Connection, shared: Arc<PoolShared>) -> Self {
        Self {
            connection: Some(connection),
            shared,
        }
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("BUG: PooledConnection has None connection (this should never happen)")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("BUG: PooledConnection has None connection (this should never happen)")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.connection.take() else {
            return;
        };

        match self.shared.state.lock() {
            Ok(mut state) => {
                state.checked_out -= 1;
                if state.idle.len() < self.shared.max_size {
                    state.idle.push(conn);
                } else {
                    tracing::warn!(
                        idle = state.idle.len(),
                        max_size = self.shared.max_size,
                        "Pool is full when returning connection"
                    );
                }
            }
            Err(_) => {
                tracing::error!("Failed to lock pool for connection return - connection dropped");
                return;
            }
        }
        self.shared.returned.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rejects_bad_paths() {
        assert!(SqlitePool::new("../escape.db", 1).is_err());
        assert!(SqlitePool::new("/tmp/no-extension", 1).is_err());
        assert!(SqlitePool::new("/tmp/wrong.txt", 1).is_err());
    }

    #[test]
    fn test_rejects_zero_size() {
        let dir = tempdir().unwrap();
        assert!(SqlitePool::new(dir.path().join("zero.db"), 0).is_err());
    }

    #[test]
    fn test_connections_are_configured() {
        let dir = tempdir().unwrap();
        let pool = SqlitePool::new(dir.path().join("pragmas.db"), 2).unwrap();
        let conn = pool.acquire().unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_connections_return_to_pool() {
        let dir = tempdir().unwrap();
        let pool = SqlitePool::new(dir.path().join("reuse.db"), 2).unwrap();

        {
            let _a = pool.acquire().unwrap();
            let _b = pool.acquire().unwrap();
            let health = pool.health_check().unwrap();
            assert_eq!(health.checked_out, 2);
            assert_eq!(health.idle_connections, 0);
        }

        let health = pool.health_check().unwrap();
        assert_eq!(health.checked_out, 0);
        assert_eq!(health.idle_connections, 2);
    }

    #[test]
    fn test_exhausted_pool_times_out() {
        let dir = tempdir().unwrap();
        let config = ConnectionConfig {
            acquire_timeout: Duration::from_millis(50),
            ..ConnectionConfig::default()
        };
        let pool = SqlitePool::with_config(dir.path().join("busy.db"), 1, config).unwrap();

        let _held = pool.acquire().unwrap();
        let error = pool.acquire().err().unwrap();
        assert!(error.details.contains("exhausted"));
    }

    #[test]
    fn test_waiter_receives_returned_connection() {
        let dir = tempdir().unwrap();
        let pool = Arc::new(SqlitePool::new(dir.path().join("wait.db"), 1).unwrap());

        let held = pool.acquire().unwrap();
        let waiter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || pool.acquire().map(|_| ()))
        };

        std::thread::sleep(Duration::from_millis(20));
        drop(held);
        assert!(waiter.join().unwrap().is_ok());
    }
}
