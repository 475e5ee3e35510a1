//! Error responses
//!
//! Every failure leaves the server as `{"code": ..., "message": ...}` with a
//! stable snake_case code. Server-side failures are logged in full and
//! answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use strongbox_core::BackupError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("missing bearer token")]
    AuthenticationRequired,

    #[error("invalid bearer token")]
    InvalidAuthentication,

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Backup(error) => match error {
                BackupError::AuthenticationFailed | BackupError::InvalidPayload { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                BackupError::InvalidEnvelope { .. } | BackupError::InvalidSelection { .. } => {
                    StatusCode::BAD_REQUEST
                }
                BackupError::NotFound { .. } => StatusCode::NOT_FOUND,
                BackupError::Database { .. } => StatusCode::SERVICE_UNAVAILABLE,
                BackupError::EncryptionFailed
                | BackupError::Serialization(_)
                | BackupError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::AuthenticationRequired | ApiError::InvalidAuthentication => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Backup(error) => error.code(),
            ApiError::AuthenticationRequired => "authentication_required",
            ApiError::InvalidAuthentication => "invalid_authentication",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Backup(BackupError::Io(_) | BackupError::Serialization(_))
            | ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
