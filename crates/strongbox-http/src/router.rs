//! HTTP router configuration

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::handlers::{
    create_backup, download_backup, health_check, list_backups, preview, restore_full,
    restore_selective,
};
use crate::state::AppState;

/// Build the router. Everything but `/health` requires the admin token.
pub fn router(state: AppState, max_body_size: usize) -> Router {
    let protected_routes = Router::new()
        .route("/backups", get(list_backups).post(create_backup))
        .route("/backups/{name}", get(download_backup))
        .route("/restore/preview", post(preview))
        .route("/restore/full", post(restore_full))
        .route("/restore/selective", post(restore_selective))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
}
