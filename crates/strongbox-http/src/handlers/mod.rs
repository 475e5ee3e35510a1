//! HTTP request handlers

pub mod backups;
pub mod health;
pub mod restore;

pub use backups::{PERSISTED_HEADER, create_backup, download_backup, list_backups};
pub use health::health_check;
pub use restore::{preview, restore_full, restore_selective};
