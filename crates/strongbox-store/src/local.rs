//! Local directory of backup artifacts
//!
//! Every backup is also written here as a convenience copy. Lookups by
//! name only ever honor the basename, so a caller cannot reach outside
//! the directory.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use strongbox_core::{BackupError, BackupResult};

/// File extension of stored artifacts.
pub const BACKUP_EXTENSION: &str = "sbx";

/// Metadata of one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredBackup {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Result of writing one artifact.
#[derive(Debug, Clone)]
pub struct PersistedFile {
    pub path: PathBuf,
    /// Length of the file as read back from the filesystem.
    pub written_len: u64,
}

#[derive(Debug, Clone)]
pub struct LocalBackupStore {
    dir: PathBuf,
}

impl LocalBackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` as `filename`, creating the directory if needed.
    pub fn persist(&self, filename: &str, bytes: &[u8]) -> BackupResult<PersistedFile> {
        let name = sanitize_name(filename)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        let written_len = fs::metadata(&path)?.len();

        Ok(PersistedFile { path, written_len })
    }

    /// Stored artifacts, newest first. A missing directory is empty.
    pub fn list(&self) -> BackupResult<Vec<StoredBackup>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.')
                || path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION)
            {
                continue;
            }

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            backups.push(StoredBackup {
                name: name.to_string(),
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        // Names embed the creation time, so they break ties between equal mtimes
        backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// Read a stored artifact by name.
    ///
    /// Any directory part of `name` is discarded; empty, `.`/`..` and
    /// hidden names are refused.
    pub fn read(&self, name: &str) -> BackupResult<Vec<u8>> {
        let basename = sanitize_name(name)?;
        let path = self.dir.join(basename);

        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BackupError::NotFound {
                name: basename.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn sanitize_name(name: &str) -> BackupResult<&str> {
    let basename = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if basename.is_empty() || basename.starts_with('.') {
        tracing::warn!(requested = name, "Rejected backup name");
        return Err(BackupError::NotFound {
            name: name.to_string(),
        });
    }
    Ok(basename)
}
