//! Preview and restore handlers
//!
//! Each takes the raw artifact as the request body. The confirmation step
//! is the client's responsibility; these routes only require the admin
//! capability.

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use std::collections::BTreeSet;

use strongbox_store::{PreviewReport, RestoreReport};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectiveParams {
    /// Comma-separated table names.
    pub tables: Option<String>,
}

impl SelectiveParams {
    pub fn selection(&self) -> BTreeSet<String> {
        self.tables
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn require_body(body: &Bytes) -> ApiResult<()> {
    if body.is_empty() {
        return Err(ApiError::BadRequest(
            "request body must contain a backup artifact".to_string(),
        ));
    }
    Ok(())
}

/// POST /restore/preview
pub async fn preview(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<PreviewReport>> {
    require_body(&body)?;
    let report = state
        .run_blocking(move |engine| engine.preview(&body))
        .await?;
    Ok(Json(report))
}

/// POST /restore/full
pub async fn restore_full(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<RestoreReport>> {
    require_body(&body)?;
    tracing::warn!(bytes = body.len(), "Full restore requested");
    let report = state
        .run_blocking(move |engine| engine.restore_full(&body))
        .await?;
    Ok(Json(report))
}

/// POST /restore/selective?tables=a,b
pub async fn restore_selective(
    State(state): State<AppState>,
    Query(params): Query<SelectiveParams>,
    body: Bytes,
) -> ApiResult<Json<RestoreReport>> {
    require_body(&body)?;
    let selection = params.selection();
    tracing::warn!(tables = ?selection, "Selective restore requested");
    let report = state
        .run_blocking(move |engine| engine.restore_selective(&body, &selection))
        .await?;
    Ok(Json(report))
}
