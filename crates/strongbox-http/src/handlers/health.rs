use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /health - liveness plus connection pool occupancy
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, code, pool) = match state.engine.health() {
        Ok(health) => (
            "healthy",
            StatusCode::OK,
            json!({
                "idle": health.idle_connections,
                "checked_out": health.checked_out,
                "max_size": health.max_size,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not inspect the pool");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, Value::Null)
        }
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": "strongbox",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
            "pool": pool,
        })),
    )
}
