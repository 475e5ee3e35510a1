//! # Admin Authentication
//!
//! Every route except `/health` requires `Authorization: Bearer <token>`
//! matching the configured admin token. The comparison is constant time.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    Some(token.trim())
}

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::AuthenticationRequired)?;

    if !state.admin_token.constant_time_eq(token) {
        return Err(ApiError::InvalidAuthentication);
    }

    Ok(next.run(request).await)
}
