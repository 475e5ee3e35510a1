//! # Strongbox HTTP
//!
//! axum transport for the Strongbox backup engine.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/health` | liveness (no auth) |
//! | POST | `/backups` | create a backup, returned as `application/octet-stream` |
//! | GET | `/backups` | list stored backups |
//! | GET | `/backups/{name}` | download a stored backup |
//! | POST | `/restore/preview` | per-table row deltas, read only |
//! | POST | `/restore/full` | replace every table |
//! | POST | `/restore/selective?tables=a,b` | replace the named tables |
//!
//! All routes but `/health` require `Authorization: Bearer <admin token>`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod shutdown;
pub mod state;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use router::router;
pub use shutdown::shutdown_signal;
pub use state::AppState;
