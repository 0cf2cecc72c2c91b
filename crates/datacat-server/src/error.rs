//! Server-specific error types

use crate::api::response::ErrorResponse;
use crate::db::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Result type alias for JSON endpoints
pub type ApiResult<T> = std::result::Result<T, AppError>;

/// Errors of the JSON endpoints (health, access info)
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Database(DbError::NotFound(message)) | AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", message)
            },
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            },
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            AppError::Unavailable(message) => {
                tracing::warn!("Service unavailable: {}", message);
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(DbError::not_found("Dataset", 3))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(DbError::Unavailable("down".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Unavailable("db".into()).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
