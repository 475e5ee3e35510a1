//! Produce encrypted backup artifacts
//!
//! The artifact is always returned to the caller. Writing the local copy is
//! best effort: failures are logged and reported on the artifact, never
//! returned as errors.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use strongbox_core::{BackupResult, EnvelopeCipher, RecoveredFailure};

use crate::database::Database;
use crate::dumper::Dumper;
use crate::local::{BACKUP_EXTENSION, LocalBackupStore};

/// One encrypted backup.
#[derive(Debug, Clone)]
pub struct BackupArtifact {
    /// `IV ‖ tag ‖ ciphertext`.
    pub bytes: Vec<u8>,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    /// Number of tables in the snapshot, and how many of them are error markers.
    pub tables: usize,
    pub failed_tables: usize,
    pub persisted_path: Option<PathBuf>,
    pub persistence_warning: Option<String>,
}

pub struct BackupWriter {
    cipher: Arc<EnvelopeCipher>,
    store: Option<LocalBackupStore>,
}

impl BackupWriter {
    pub fn new(cipher: Arc<EnvelopeCipher>, store: Option<LocalBackupStore>) -> Self {
        Self { cipher, store }
    }

    /// Dump, serialize, encrypt, then try to keep a local copy.
    pub fn create_backup<D: Database + ?Sized>(&self, db: &D) -> BackupResult<BackupArtifact> {
        let snapshot = Dumper::new(db).dump_all()?;
        let plaintext = snapshot.to_json_bytes()?;
        let bytes = self.cipher.encrypt(&plaintext)?;
        drop(plaintext);

        let filename = backup_filename(snapshot.exported_at);
        let mut artifact = BackupArtifact {
            bytes,
            filename,
            created_at: snapshot.exported_at,
            tables: snapshot.data.len(),
            failed_tables: snapshot.failed_tables(),
            persisted_path: None,
            persistence_warning: None,
        };

        if let Some(store) = &self.store {
            self.persist(store, &mut artifact);
        }

        tracing::info!(
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            tables = artifact.tables,
            failed_tables = artifact.failed_tables,
            persisted = artifact.persisted_path.is_some(),
            "Backup created"
        );
        Ok(artifact)
    }

    fn persist(&self, store: &LocalBackupStore, artifact: &mut BackupArtifact) {
        let expected = artifact.bytes.len() as u64;

        match store.persist(&artifact.filename, &artifact.bytes) {
            Ok(file) => {
                if file.written_len != expected {
                    let warning = format!(
                        "local copy is {} bytes, expected {}",
                        file.written_len, expected
                    );
                    tracing::warn!(
                        path = %file.path.display(),
                        failure = %RecoveredFailure::PersistenceFailed,
                        "Local backup length mismatch: {}",
                        warning
                    );
                    artifact.persistence_warning = Some(warning);
                }
                artifact.persisted_path = Some(file.path);
            }
            Err(e) => {
                tracing::warn!(
                    dir = %store.dir().display(),
                    failure = %RecoveredFailure::PersistenceFailed,
                    error = %e,
                    "Could not write local backup copy"
                );
                artifact.persistence_warning = Some(format!("local copy not written: {}", e));
            }
        }
    }
}

/// `backup-2024-01-01T00-00-00-000Z-1a2b3c4d.sbx`
pub fn backup_filename(at: DateTime<Utc>) -> String {
    format!(
        "backup-{}-{:08x}.{}",
        at.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
        rand::random::<u32>(),
        BACKUP_EXTENSION
    )
}
