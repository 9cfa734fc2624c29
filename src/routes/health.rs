//! Root and health endpoints.

use axum::Json;
use serde_json::json;

use crate::routes::ApiResponse;

/// GET /api/ - fixed welcome message
pub async fn api_root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Nelbert Tomicos Portfolio API - Virtual Assistant Services"
    }))
}

/// GET /api/health - liveness check
pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse::ok(
        "API is running successfully",
        json!({
            "status": "healthy",
            "message": "API is running successfully"
        }),
    ))
}
