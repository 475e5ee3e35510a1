//! Backup creation and local backup retrieval

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::error::ApiResult;
use crate::state::AppState;

/// Header telling the caller whether the server kept its own copy.
pub const PERSISTED_HEADER: &str = "x-strongbox-persisted";

fn artifact_response(bytes: Vec<u8>, filename: &str, persisted: Option<bool>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    // Only filesystem-safe names reach the header; anything else gets a bare attachment
    let safe = !filename.is_empty()
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    let disposition = if safe {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        "attachment".to_string()
    };
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    if let Some(persisted) = persisted {
        headers.insert(
            PERSISTED_HEADER,
            HeaderValue::from_static(if persisted { "true" } else { "false" }),
        );
    }

    (headers, bytes).into_response()
}

/// POST /backups - create an encrypted backup and stream it back
pub async fn create_backup(State(state): State<AppState>) -> ApiResult<Response> {
    let artifact = state.run_blocking(|engine| engine.create_backup()).await?;

    if let Some(warning) = &artifact.persistence_warning {
        tracing::warn!(
            filename = %artifact.filename,
            warning = %warning,
            "Backup returned without a verified local copy"
        );
    }

    let persisted = artifact.persisted_path.is_some() && artifact.persistence_warning.is_none();
    Ok(artifact_response(
        artifact.bytes,
        &artifact.filename,
        Some(persisted),
    ))
}

/// GET /backups - list locally stored backups, newest first
pub async fn list_backups(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let backups = state.run_blocking(|engine| engine.list_backups()).await?;
    Ok(Json(json!({ "backups": backups })))
}

/// GET /backups/{name} - download one stored backup
pub async fn download_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let lookup = name.clone();
    let bytes = state
        .run_blocking(move |engine| engine.read_backup(&lookup))
        .await?;

    let basename = std::path::Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    Ok(artifact_response(bytes, basename, None))
}
