//! Error Types
//!
//! Failures are split in two classes. [`BackupError`] covers everything that
//! compromises a whole operation (bad artifact, bad payload, bad selection,
//! unreachable database) and is always returned before any mutation happens.
//! [`RecoveredFailure`] classifies failures scoped to a single unit (one
//! table, one row, the local backup copy); those are logged and recorded in
//! operation reports while the operation itself carries on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that abort a backup, preview or restore operation.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The artifact did not verify against the derived key.
    ///
    /// Corruption, tampering and a wrong secret are deliberately
    /// indistinguishable here.
    #[error("backup artifact failed authentication")]
    AuthenticationFailed,

    /// The artifact is too short to contain an IV and an authentication tag.
    #[error("backup artifact is malformed: {len} bytes, at least {min} required")]
    InvalidEnvelope { len: usize, min: usize },

    /// The cipher refused to encrypt the payload.
    #[error("backup encryption failed")]
    EncryptionFailed,

    /// The artifact decrypted but does not hold a well-formed snapshot.
    #[error("backup payload is not a valid snapshot: {reason}")]
    InvalidPayload { reason: String },

    /// Selective restore was asked for nothing, or for tables the snapshot lacks.
    #[error("invalid table selection: {reason}")]
    InvalidSelection { reason: String },

    /// The database could not be reached or refused an operation that the
    /// whole run depends on.
    #[error("database {operation} failed: {details}")]
    Database { operation: String, details: String },

    /// A stored backup was requested that does not exist.
    #[error("backup '{name}' not found")]
    NotFound { name: String },

    /// Snapshot serialization failed.
    #[error("snapshot serialization failed: {0}")]
    Serialization(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Create an invalid payload error.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        BackupError::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Create an invalid selection error.
    pub fn invalid_selection(reason: impl Into<String>) -> Self {
        BackupError::InvalidSelection {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BackupError::AuthenticationFailed => "authentication_failed",
            BackupError::InvalidEnvelope { .. } => "invalid_envelope",
            BackupError::EncryptionFailed => "encryption_failed",
            BackupError::InvalidPayload { .. } => "invalid_payload",
            BackupError::InvalidSelection { .. } => "invalid_selection",
            BackupError::Database { .. } => "database_error",
            BackupError::NotFound { .. } => "not_found",
            BackupError::Serialization(_) => "serialization_error",
            BackupError::Io(_) => "io_error",
        }
    }

    /// Whether the error was caused by the caller's input rather than by the server.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            BackupError::AuthenticationFailed
                | BackupError::InvalidEnvelope { .. }
                | BackupError::InvalidPayload { .. }
                | BackupError::InvalidSelection { .. }
                | BackupError::NotFound { .. }
        )
    }
}

/// Result type alias for backup engine operations.
pub type BackupResult<T> = Result<T, BackupError>;

/// Failures that are recovered locally and reported instead of returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveredFailure {
    /// The local copy of a backup could not be written or verified.
    PersistenceFailed,
    /// A single row could not be inserted during restore.
    PerRowFailure,
    /// A whole table could not be dumped or restored.
    PerTableFailure,
}

impl fmt::Display for RecoveredFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveredFailure::PersistenceFailed => "persistence_failed",
            RecoveredFailure::PerRowFailure => "per_row_failure",
            RecoveredFailure::PerTableFailure => "per_table_failure",
        };
        f.write_str(name)
    }
}
