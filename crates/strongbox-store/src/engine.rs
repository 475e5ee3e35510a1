//! The four caller-facing operations behind one handle
//!
//! [`BackupEngine`] owns the database pool, the derived key and the local
//! backup directory. It assumes the caller is already authorized. Every
//! restore path decodes through the same [`RestoreDecoder`], so no path can
//! skip tag verification, and destructive work runs under the restore lock
//! for the database target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use strongbox_core::{BackupResult, EnvelopeCipher, RestoreDecoder, SecretString};

use crate::config::EngineConfig;
use crate::local::{LocalBackupStore, StoredBackup};
use crate::lock::with_restore_lock;
use crate::preview::{Preview, PreviewEngine};
use crate::report::RestoreReport;
use crate::restore::{FullRestorer, SelectiveRestorer, check_selection, validate_selection};
use crate::sqlite::{PoolHealth, SqliteDatabase};
use crate::writer::{BackupArtifact, BackupWriter};

/// Preview of one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub exported_at: DateTime<Utc>,
    pub tables: Preview,
}

impl PreviewReport {
    /// Same checks a selective restore of this artifact would make.
    pub fn validate_selection(&self, tables: &BTreeSet<String>) -> BackupResult<()> {
        check_selection(tables, |name| self.tables.contains_key(name))
    }
}

pub struct BackupEngine {
    db: SqliteDatabase,
    decoder: RestoreDecoder,
    writer: BackupWriter,
    store: LocalBackupStore,
}

impl BackupEngine {
    /// Open the database and derive the key.
    pub fn open(config: &EngineConfig) -> BackupResult<Self> {
        let db = SqliteDatabase::open(&config.database_path, config.pool_size)?;
        Ok(Self::new(
            db,
            &config.backup_secret,
            LocalBackupStore::new(&config.backup_dir),
        ))
    }

    pub fn new(db: SqliteDatabase, secret: &SecretString, store: LocalBackupStore) -> Self {
        let cipher = Arc::new(EnvelopeCipher::from_secret(secret));
        Self {
            db,
            decoder: RestoreDecoder::new(Arc::clone(&cipher)),
            writer: BackupWriter::new(cipher, Some(store.clone())),
            store,
        }
    }

    pub fn create_backup(&self) -> BackupResult<BackupArtifact> {
        let conn = self.db.acquire()?;
        self.writer.create_backup(&*conn)
    }

    /// Decode `artifact` and compare it against the live database. Read only.
    pub fn preview(&self, artifact: &[u8]) -> BackupResult<PreviewReport> {
        let snapshot = self.decoder.decode(artifact)?;
        let conn = self.db.acquire()?;
        let tables = PreviewEngine::new(&*conn).preview(&snapshot);

        tracing::info!(tables = tables.len(), "Restore preview computed");
        Ok(PreviewReport {
            exported_at: snapshot.exported_at,
            tables,
        })
    }

    pub fn restore_full(&self, artifact: &[u8]) -> BackupResult<RestoreReport> {
        let snapshot = self.decoder.decode(artifact)?;

        with_restore_lock(self.db.path(), || -> BackupResult<RestoreReport> {
            let conn = self.db.acquire()?;
            FullRestorer::new(&*conn).restore_all(&snapshot)
        })
    }

    /// Restore only `tables`. An empty or unknown selection fails before
    /// any connection is taken.
    pub fn restore_selective(
        &self,
        artifact: &[u8],
        tables: &BTreeSet<String>,
    ) -> BackupResult<RestoreReport> {
        let snapshot = self.decoder.decode(artifact)?;
        validate_selection(&snapshot, tables)?;

        with_restore_lock(self.db.path(), || -> BackupResult<RestoreReport> {
            let conn = self.db.acquire()?;
            SelectiveRestorer::new(&*conn).restore_selected(&snapshot, tables)
        })
    }

    pub fn list_backups(&self) -> BackupResult<Vec<StoredBackup>> {
        self.store.list()
    }

    pub fn read_backup(&self, name: &str) -> BackupResult<Vec<u8>> {
        self.store.read(name)
    }

    pub fn health(&self) -> BackupResult<PoolHealth> {
        Ok(self.db.health()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfigBuilder;
    use strongbox_core::BackupError;
    use tempfile::{TempDir, tempdir};

    fn engine() -> (TempDir, BackupEngine) {
        let dir = tempdir().unwrap();
        let config = EngineConfigBuilder::new()
            .database_path(dir.path().join("app.db"))
            .backup_secret(SecretString::new("engine-test".to_string()))
            .backup_dir(dir.path().join("backups"))
            .pool_size(2)
            .build()
            .unwrap();
        let engine = BackupEngine::open(&config).unwrap();

        let conn = engine.db.acquire().unwrap();
        conn.execute_batch(
            "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO widgets VALUES (1, 'A'), (2, 'B');",
        )
        .unwrap();
        drop(conn);

        (dir, engine)
    }

    #[test]
    fn test_backup_then_full_restore() {
        let (_dir, engine) = engine();
        let artifact = engine.create_backup().unwrap();
        assert_eq!(engine.list_backups().unwrap()[0].name, artifact.filename);

        engine
            .db
            .acquire()
            .unwrap()
            .execute_batch("DELETE FROM widgets;")
            .unwrap();

        let report = engine.restore_full(&artifact.bytes).unwrap();
        assert_eq!(report.rows_inserted(), 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_stored_copy_is_restorable() {
        let (_dir, engine) = engine();
        let artifact = engine.create_backup().unwrap();
        let stored = engine.read_backup(&artifact.filename).unwrap();
        assert_eq!(stored, artifact.bytes);

        let preview = engine.preview(&stored).unwrap();
        assert_eq!(preview.tables["widgets"].incoming, 2);
        assert_eq!(preview.tables["widgets"].existing, Some(2));
    }

    #[test]
    fn test_tampered_artifact_rejected_on_every_path() {
        let (_dir, engine) = engine();
        let mut bytes = engine.create_backup().unwrap().bytes;
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        assert!(matches!(engine.preview(&bytes), Err(BackupError::AuthenticationFailed)));
        assert!(matches!(engine.restore_full(&bytes), Err(BackupError::AuthenticationFailed)));
        let selection = BTreeSet::from(["widgets".to_string()]);
        assert!(matches!(
            engine.restore_selective(&bytes, &selection),
            Err(BackupError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_selective_requires_selection() {
        let (_dir, engine) = engine();
        let artifact = engine.create_backup().unwrap();
        assert!(matches!(
            engine.restore_selective(&artifact.bytes, &BTreeSet::new()),
            Err(BackupError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn test_preview_checks_selection_like_restore() {
        let (_dir, engine) = engine();
        let artifact = engine.create_backup().unwrap();
        let preview = engine.preview(&artifact.bytes).unwrap();

        let known = BTreeSet::from(["widgets".to_string()]);
        let unknown = BTreeSet::from(["gadgets".to_string()]);

        assert!(preview.validate_selection(&known).is_ok());
        let from_preview = preview.validate_selection(&unknown).unwrap_err();
        let from_restore = engine
            .restore_selective(&artifact.bytes, &unknown)
            .unwrap_err();
        assert_eq!(from_preview.to_string(), from_restore.to_string());
    }
}
