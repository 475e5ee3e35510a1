//! # Strongbox
//!
//! Encrypted, authenticated backup and restore for SQLite-backed
//! applications.
//!
//! - [`core`]: snapshot model, AES-256-GCM envelope, restore decoder and the
//!   confirmation gate
//! - [`store`]: table discovery, dump, preview, full and selective restore
//! - [`http`]: axum routes over the engine
//!
//! ```no_run
//! use strongbox::core::SecretString;
//! use strongbox::store::{BackupEngine, EngineConfigBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfigBuilder::new()
//!     .database_path("app.db")
//!     .backup_secret(SecretString::new("change-me".to_string()))
//!     .build()?;
//! let engine = BackupEngine::open(&config)?;
//!
//! let artifact = engine.create_backup()?;
//! let preview = engine.preview(&artifact.bytes)?;
//! println!("{} tables in backup", preview.tables.len());
//! # Ok(())
//! # }
//! ```

pub use strongbox_core as core;
pub use strongbox_http as http;
pub use strongbox_store as store;

pub use strongbox_core::{BackupError, BackupResult, SecretString, Snapshot};
pub use strongbox_store::{BackupEngine, EngineConfig, EngineConfigBuilder, RestoreReport};
