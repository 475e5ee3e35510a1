//! # Strongbox Store
//!
//! The database-facing half of the Strongbox backup engine.
//!
//! ## Components
//!
//! - **[Database]**: the primitives the engine needs from a relational
//!   database, implemented for SQLite connections in [`sqlite`]
//! - **[TableCatalog]** and **[Dumper]**: discover every live table and
//!   snapshot its rows, recording unreadable tables with an error marker
//! - **[BackupWriter]**: encrypt a snapshot into an artifact and keep a
//!   best-effort copy in a [`LocalBackupStore`]
//! - **[PreviewEngine]**: row-count deltas and samples, strictly read only
//! - **[FullRestorer]** and **[SelectiveRestorer]**: best-effort table
//!   replacement, reported per table in a [`RestoreReport`]
//! - **[BackupEngine]**: the four caller-facing operations over one pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use strongbox_store::{BackupEngine, EngineConfigBuilder};
//!
//! let config = EngineConfigBuilder::from_env()?.build()?;
//! let engine = BackupEngine::open(&config)?;
//!
//! let artifact = engine.create_backup()?;
//! let preview = engine.preview(&artifact.bytes)?;
//! println!("{} tables in {}", preview.tables.len(), artifact.filename);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod config;
pub mod database;
pub mod dumper;
pub mod engine;
pub mod guard;
pub mod local;
pub mod lock;
pub mod preview;
pub mod report;
pub mod restore;
pub mod sqlite;
pub mod writer;

pub use catalog::TableCatalog;
pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use database::{Database, DbError, DbOperation, DbResult, quote_identifier};
pub use dumper::Dumper;
pub use engine::{BackupEngine, PreviewReport};
pub use guard::{ForeignKeyGuard, ReadTransaction};
pub use local::{BACKUP_EXTENSION, LocalBackupStore, StoredBackup};
pub use lock::with_restore_lock;
pub use preview::{Preview, PreviewEngine, PreviewStat, SAMPLE_SIZE};
pub use report::{RestoreMode, RestoreReport, SkipReason, TableOutcome, TableReport, UnitFailure};
pub use restore::{FullRestorer, SelectiveRestorer, validate_selection};
pub use sqlite::{BLOB_KEY, PoolHealth, SqliteDatabase, SqlitePool, TEXT_BYTES_KEY};
pub use writer::{BackupArtifact, BackupWriter, backup_filename};
