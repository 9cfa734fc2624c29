//! Profile Routes
//! The profile is a singleton: created at startup, updated in place,
//! never deleted.

use axum::Json;
use serde_json::json;

use crate::db::models::{Profile, ProfileUpdate};
use crate::error::ApiError;
use crate::routes::{pool, ApiResponse};

const PROFILE_COLUMNS: &str =
    "id, name, title, email, phone, location, bio, profile_image, linkedin, created_at, updated_at";

/// GET /api/profile
pub async fn get_profile() -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    let profile = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profile LIMIT 1"
    ))
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Profile retrieved successfully",
        serde_json::to_value(&profile)?,
    )))
}

/// PUT /api/profile - partial update; only provided fields change
pub async fn update_profile(
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    let existing = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profile LIMIT 1"
    ))
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    let name = payload.name.unwrap_or(existing.name);
    let title = payload.title.unwrap_or(existing.title);
    let email = payload.email.unwrap_or(existing.email);
    let phone = payload.phone.unwrap_or(existing.phone);
    let location = payload.location.unwrap_or(existing.location);
    let bio = payload.bio.unwrap_or(existing.bio);
    let profile_image = payload.profile_image.unwrap_or(existing.profile_image);
    let linkedin = payload.linkedin.unwrap_or(existing.linkedin);

    let updated = sqlx::query_as::<_, Profile>(&format!(
        r#"
        UPDATE profile
        SET name = $1, title = $2, email = $3, phone = $4, location = $5,
            bio = $6, profile_image = $7, linkedin = $8, updated_at = now()
        WHERE id = $9
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(&name)
    .bind(&title)
    .bind(&email)
    .bind(&phone)
    .bind(&location)
    .bind(&bio)
    .bind(&profile_image)
    .bind(&linkedin)
    .bind(&existing.id)
    .fetch_one(pool.as_ref())
    .await?;

    Ok(Json(ApiResponse::ok(
        "Profile updated successfully",
        serde_json::to_value(&updated)?,
    )))
}

/// POST /api/profile/photo - placeholder, no file storage behavior yet
pub async fn upload_profile_photo() -> Result<Json<ApiResponse>, ApiError> {
    Ok(Json(ApiResponse::ok(
        "Photo upload endpoint ready for implementation",
        json!({ "note": "File upload functionality to be implemented" }),
    )))
}
