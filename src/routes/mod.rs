//! API route handlers and the shared response envelope.

pub mod analytics;
pub mod blog;
pub mod contact;
pub mod health;
pub mod profile;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::ApiError;

/// Uniform response envelope: `{success, message, data?}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Fetch the shared pool or fail the request with 503.
pub(crate) fn pool() -> Result<Arc<PgPool>, ApiError> {
    crate::db::get_pool().ok_or(ApiError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_absent_data() {
        let json = serde_json::to_value(ApiResponse::ok_message("done")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "done");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_envelope_includes_data_when_present() {
        let json = serde_json::to_value(ApiResponse::ok(
            "retrieved",
            serde_json::json!({"total": 3}),
        ))
        .unwrap();
        assert_eq!(json["data"]["total"], 3);
    }

    #[test]
    fn test_failure_envelope() {
        let json = serde_json::to_value(ApiResponse::failure("nope")).unwrap();
        assert_eq!(json["success"], false);
    }
}
