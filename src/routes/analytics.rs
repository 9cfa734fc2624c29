//! Analytics Routes
//! A single counters row tracks site usage. Increments are single
//! atomic statements, so concurrent bumps never lose updates.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::models::{Analytics, AnalyticsUpdate};
use crate::error::ApiError;
use crate::routes::{pool, ApiResponse};

const ANALYTICS_COLUMNS: &str =
    "id, website_views, blog_views, contact_inquiries, social_media_followers, date";

/// Follower count used when the counters row is created lazily.
const DEFAULT_SOCIAL_FOLLOWERS: i64 = 456;

/// Which counter an event increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CounterField {
    WebsiteViews,
    BlogViews,
    ContactInquiries,
}

impl CounterField {
    fn deltas(self) -> (i64, i64, i64) {
        match self {
            CounterField::WebsiteViews => (1, 0, 0),
            CounterField::BlogViews => (0, 1, 0),
            CounterField::ContactInquiries => (0, 0, 1),
        }
    }
}

/// Atomically bump one counter, creating the counters row with the
/// increment already applied when it does not exist yet. The upsert is a
/// single statement: concurrent calls each land exactly once.
pub(crate) async fn record_increment(
    pool: &PgPool,
    field: CounterField,
) -> Result<(), sqlx::Error> {
    let (website, blog, inquiries) = field.deltas();

    sqlx::query(
        r#"
        INSERT INTO analytics (id, website_views, blog_views, contact_inquiries, social_media_followers, date)
        VALUES ('current', $1, $2, $3, $4, now())
        ON CONFLICT (id) DO UPDATE SET
            website_views = analytics.website_views + $1,
            blog_views = analytics.blog_views + $2,
            contact_inquiries = analytics.contact_inquiries + $3
        "#,
    )
    .bind(website)
    .bind(blog)
    .bind(inquiries)
    .bind(DEFAULT_SOCIAL_FOLLOWERS)
    .execute(pool)
    .await?;

    Ok(())
}

/// GET /api/analytics - counters, lazily created if missing
pub async fn get_analytics() -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    let existing = sqlx::query_as::<_, Analytics>(&format!(
        "SELECT {ANALYTICS_COLUMNS} FROM analytics LIMIT 1"
    ))
    .fetch_optional(pool.as_ref())
    .await?;

    let analytics = match existing {
        Some(a) => a,
        None => {
            sqlx::query(
                r#"
                INSERT INTO analytics (id, website_views, blog_views, contact_inquiries, social_media_followers, date)
                VALUES ('current', 0, 0, 0, $1, now())
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(DEFAULT_SOCIAL_FOLLOWERS)
            .execute(pool.as_ref())
            .await?;

            sqlx::query_as::<_, Analytics>(&format!(
                "SELECT {ANALYTICS_COLUMNS} FROM analytics LIMIT 1"
            ))
            .fetch_one(pool.as_ref())
            .await?
        }
    };

    Ok(Json(ApiResponse::ok(
        "Analytics retrieved successfully",
        serde_json::to_value(&analytics)?,
    )))
}

/// Query parameters for POST /api/analytics/view
#[derive(Debug, Deserialize)]
pub struct TrackViewQuery {
    pub view_type: Option<String>,
}

/// POST /api/analytics/view?view_type=website|blog
pub async fn track_view(
    Query(query): Query<TrackViewQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    // Unrecognized kinds count as website views.
    let (field, label) = match query.view_type.as_deref() {
        Some("blog") => (CounterField::BlogViews, "Blog"),
        _ => (CounterField::WebsiteViews, "Website"),
    };

    record_increment(pool.as_ref(), field).await?;

    Ok(Json(ApiResponse::ok_message(format!(
        "{} view tracked successfully",
        label
    ))))
}

/// PUT /api/analytics - admin override of counter values
pub async fn update_analytics(
    Json(payload): Json<AnalyticsUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    let existing = sqlx::query_as::<_, Analytics>(&format!(
        "SELECT {ANALYTICS_COLUMNS} FROM analytics LIMIT 1"
    ))
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Analytics not found".to_string()))?;

    let website_views = payload.website_views.unwrap_or(existing.website_views);
    let blog_views = payload.blog_views.unwrap_or(existing.blog_views);
    let contact_inquiries = payload
        .contact_inquiries
        .unwrap_or(existing.contact_inquiries);
    let social_media_followers = payload
        .social_media_followers
        .unwrap_or(existing.social_media_followers);

    sqlx::query(
        r#"
        UPDATE analytics
        SET website_views = $1, blog_views = $2, contact_inquiries = $3, social_media_followers = $4
        WHERE id = $5
        "#,
    )
    .bind(website_views)
    .bind(blog_views)
    .bind(contact_inquiries)
    .bind(social_media_followers)
    .bind(&existing.id)
    .execute(pool.as_ref())
    .await?;

    Ok(Json(ApiResponse::ok_message(
        "Analytics updated successfully",
    )))
}
