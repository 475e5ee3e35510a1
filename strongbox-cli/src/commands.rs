//! Subcommand implementations
//!
//! Each command writes its JSON result to `out` so the binary can pipe it to
//! stdout and the tests can capture it.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::json;
use strongbox_core::{BackupError, RestorePermit};
use strongbox_store::{BackupEngine, ConfigError, PreviewReport, RestoreReport};

use crate::confirm::ConfirmError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Confirm(#[from] ConfirmError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("output encoding failed: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> CliError {
        let context = context.into();
        move |source| CliError::Io { context, source }
    }
}

pub type CliResult<T> = Result<T, CliError>;

fn emit(out: &mut impl Write, value: &impl serde::Serialize) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out).map_err(CliError::io("writing output"))
}

/// Parse `a,b , c` into a table selection.
pub fn parse_tables(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_artifact(path: &Path) -> CliResult<Vec<u8>> {
    fs::read(path).map_err(CliError::io(format!("reading {}", path.display())))
}

pub fn backup(
    engine: &BackupEngine,
    out_path: Option<&Path>,
    out: &mut impl Write,
) -> CliResult<()> {
    let artifact = engine.create_backup()?;

    if let Some(path) = out_path {
        fs::write(path, &artifact.bytes)
            .map_err(CliError::io(format!("writing {}", path.display())))?;
    }

    emit(
        out,
        &json!({
            "filename": artifact.filename,
            "created_at": artifact.created_at,
            "size_bytes": artifact.bytes.len(),
            "tables": artifact.tables,
            "failed_tables": artifact.failed_tables,
            "persisted_path": artifact.persisted_path,
            "persistence_warning": artifact.persistence_warning,
            "written_to": out_path,
        }),
    )
}

pub fn list(engine: &BackupEngine, out: &mut impl Write) -> CliResult<()> {
    let backups = engine.list_backups()?;
    emit(out, &json!({ "backups": backups }))
}

pub fn preview(
    engine: &BackupEngine,
    artifact: &[u8],
    out: &mut impl Write,
) -> CliResult<PreviewReport> {
    let report = engine.preview(artifact)?;
    emit(out, &report)?;
    Ok(report)
}

/// Perform a confirmed restore. `tables` of `None` means a full restore.
///
/// The permit is consumed whether or not the restore succeeds.
pub fn restore(
    engine: &BackupEngine,
    artifact: &[u8],
    tables: Option<&BTreeSet<String>>,
    _permit: RestorePermit,
    out: &mut impl Write,
) -> CliResult<RestoreReport> {
    let report = match tables {
        Some(selection) => engine.restore_selective(artifact, selection)?,
        None => engine.restore_full(artifact)?,
    };

    let attention = report.tables_needing_attention();
    if !attention.is_empty() {
        tracing::warn!(tables = ?attention, "Restore finished with failures");
    }
    emit(out, &report)?;
    Ok(report)
}
