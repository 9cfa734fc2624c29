//! Request error taxonomy mapped onto the uniform response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::routes::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed input, rejected before any database access.
    #[error("{0}")]
    Validation(String),

    /// Singleton or id-keyed lookup miss.
    #[error("{0}")]
    NotFound(String),

    /// The connection pool was never initialized.
    #[error("Database not available")]
    Unavailable,

    /// Any database failure. Detail is logged server-side, never surfaced.
    #[error("Internal server error")]
    Database(#[from] sqlx::Error),

    /// Response serialization failure (should not happen for derived types).
    #[error("Internal server error")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::failure(message))).into_response()
    }
}
