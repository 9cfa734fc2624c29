//! Contact Routes
//! Public form submission plus admin listing, status updates, and deletion.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Contact, ContactCreate, ContactUpdate};
use crate::error::ApiError;
use crate::routes::analytics::{record_increment, CounterField};
use crate::routes::{pool, ApiResponse};

const CONTACT_COLUMNS: &str =
    "id, name, email, subject, message, status, created_at, replied_at";

lazy_static! {
    /// Syntactic email check: one '@', no whitespace, dotted domain.
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Submission response: the envelope variant carrying the created contact.
#[derive(Debug, Serialize)]
pub struct ContactSubmitResponse {
    pub success: bool,
    pub message: String,
    pub contact: Contact,
}

/// POST /api/contact - submit the contact form
pub async fn submit_contact(
    Json(payload): Json<ContactCreate>,
) -> Result<(StatusCode, Json<ContactSubmitResponse>), ApiError> {
    // Reject malformed input before touching the database.
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation(format!(
            "Invalid email address: {}",
            payload.email
        )));
    }

    let pool = pool()?;

    let contact = insert_contact(pool.as_ref(), &payload).await?;

    // Best-effort counter bump; the submission already succeeded.
    if let Err(e) = record_increment(pool.as_ref(), CounterField::ContactInquiries).await {
        tracing::warn!(contact_id = %contact.id, "Failed to record contact inquiry: {}", e);
    }

    Ok((
        StatusCode::OK,
        Json(ContactSubmitResponse {
            success: true,
            message: "Thank you for reaching out! I'll get back to you within 24 hours."
                .to_string(),
            contact,
        }),
    ))
}

pub(crate) async fn insert_contact(
    pool: &PgPool,
    payload: &ContactCreate,
) -> Result<Contact, sqlx::Error> {
    sqlx::query_as::<_, Contact>(&format!(
        r#"
        INSERT INTO contacts (id, name, email, subject, message, status)
        VALUES ($1, $2, $3, $4, $5, 'new')
        RETURNING {CONTACT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.subject)
    .bind(&payload.message)
    .fetch_one(pool)
    .await
}

/// GET /api/contact - all submissions, newest first (admin)
pub async fn get_contacts() -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    let contacts = list_contacts(pool.as_ref()).await?;

    let total = contacts.len();

    Ok(Json(ApiResponse::ok(
        "Contacts retrieved successfully",
        json!({
            "contacts": serde_json::to_value(&contacts)?,
            "total": total,
        }),
    )))
}

pub(crate) async fn list_contacts(pool: &PgPool) -> Result<Vec<Contact>, sqlx::Error> {
    sqlx::query_as::<_, Contact>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC LIMIT 100"
    ))
    .fetch_all(pool)
    .await
}

/// PUT /api/contact/{id} - update status / repliedAt (admin)
pub async fn update_contact(
    Path(id): Path<String>,
    Json(payload): Json<ContactUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let id = parse_contact_id(&id)?;
    let pool = pool()?;

    let existing = sqlx::query_as::<_, Contact>(&format!(
        "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Contact not found".to_string()))?;

    if !apply_update(pool.as_ref(), existing, payload).await? {
        return Err(ApiError::NotFound("Contact not found".to_string()));
    }

    Ok(Json(ApiResponse::ok_message("Contact updated successfully")))
}

/// Merge `payload` over `existing` and write it back. An omitted
/// `repliedAt` keeps the stored timestamp; an explicit null clears it.
/// Returns false when the row vanished since the caller's fetch.
pub(crate) async fn apply_update(
    pool: &PgPool,
    existing: Contact,
    payload: ContactUpdate,
) -> Result<bool, sqlx::Error> {
    let status = payload.status.unwrap_or(existing.status);
    let replied_at = match payload.replied_at {
        Some(explicit) => explicit,
        None => existing.replied_at,
    };

    let result = sqlx::query("UPDATE contacts SET status = $1, replied_at = $2 WHERE id = $3")
        .bind(&status)
        .bind(replied_at)
        .bind(existing.id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// DELETE /api/contact/{id} (admin)
pub async fn delete_contact(Path(id): Path<String>) -> Result<Json<ApiResponse>, ApiError> {
    let id = parse_contact_id(&id)?;
    let pool = pool()?;

    let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Contact not found".to_string()));
    }

    Ok(Json(ApiResponse::ok_message("Contact deleted successfully")))
}

// Ids are opaque tokens to callers; anything that is not a UUID cannot
// match a stored contact.
fn parse_contact_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Contact not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route("/api/contact", get(get_contacts).post(submit_contact))
            .route(
                "/api/contact/{id}",
                axum::routing::put(update_contact).delete(delete_contact),
            )
    }

    #[test]
    fn test_email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("jane@example.com"));
        assert!(is_valid_email("jane.doe+tag@mail.example.co"));
    }

    #[test]
    fn test_email_validation_rejects_malformed_input() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_email_before_any_store_access() {
        // No pool is initialized in tests: a 400 here proves validation
        // fires before the database is ever consulted.
        let req = Request::post("/api/contact")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"name":"J","email":"not-an-email","subject":"s","message":"m"}"#,
            ))
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("not-an-email"));
    }

    #[tokio::test]
    async fn test_update_with_non_uuid_id_is_not_found() {
        let req = Request::put("/api/contact/no-such-id")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status":"replied"}"#))
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    fn submission() -> ContactCreate {
        ContactCreate {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            subject: "Project inquiry".to_string(),
            message: "Hello there".to_string(),
        }
    }

    async fn fetch(pool: &PgPool, id: Uuid) -> Contact {
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn test_submission_round_trip(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();

        let created = insert_contact(&pool, &submission()).await.unwrap();
        assert_eq!(created.status, "new");
        assert!(created.replied_at.is_none());

        let listed = list_contacts(&pool).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].email, "jane@example.com");
        assert_eq!(listed[0].message, "Hello there");
    }

    #[sqlx::test]
    async fn test_replied_at_can_be_set_kept_and_cleared(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        let created = insert_contact(&pool, &submission()).await.unwrap();
        let replied = chrono::Utc::now();

        let update = ContactUpdate {
            status: Some("replied".to_string()),
            replied_at: Some(Some(replied)),
        };
        assert!(apply_update(&pool, created.clone(), update).await.unwrap());
        let stored = fetch(&pool, created.id).await;
        assert_eq!(stored.status, "replied");
        assert!(stored.replied_at.is_some());

        // An update that omits repliedAt leaves the timestamp alone.
        let keep = ContactUpdate {
            status: Some("archived".to_string()),
            replied_at: None,
        };
        assert!(apply_update(&pool, stored, keep).await.unwrap());
        let stored = fetch(&pool, created.id).await;
        assert_eq!(stored.status, "archived");
        assert!(stored.replied_at.is_some());

        // An explicit null clears it.
        let clear = ContactUpdate {
            status: None,
            replied_at: Some(None),
        };
        assert!(apply_update(&pool, stored, clear).await.unwrap());
        let stored = fetch(&pool, created.id).await;
        assert!(stored.replied_at.is_none());
    }

    #[sqlx::test]
    async fn test_update_of_concurrently_deleted_contact_reports_missing(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        let created = insert_contact(&pool, &submission()).await.unwrap();

        sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(created.id)
            .execute(&pool)
            .await
            .unwrap();

        let update = ContactUpdate {
            status: Some("replied".to_string()),
            replied_at: None,
        };
        assert!(!apply_update(&pool, created, update).await.unwrap());
    }
}
