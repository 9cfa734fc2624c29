//! Blog Routes
//! CRUD over blog posts. Slugs are generated server-side from titles;
//! uniqueness is enforced by the UNIQUE constraint on blog_posts.slug,
//! with suffix retries on conflict instead of a check-then-act lookup.

use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{BlogPost, BlogPostCreate, BlogPostUpdate};
use crate::error::ApiError;
use crate::routes::analytics::{record_increment, CounterField};
use crate::routes::{pool, ApiResponse};
use crate::slug;

const BLOG_COLUMNS: &str = "id, title, slug, excerpt, content, author, category, tags, image, \
                            read_time, published, created_at, updated_at";

const DEFAULT_AUTHOR: &str = "Nelbert Tomicos";

/// Query parameters for GET /api/blog
#[derive(Debug, Deserialize)]
pub struct BlogListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default = "default_published_filter")]
    pub published: bool,
}

fn default_published_filter() -> bool {
    true
}

/// GET /api/blog - list posts with optional category/search filters
pub async fn get_blog_posts(
    Query(query): Query<BlogListQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    let posts = query_posts(
        pool.as_ref(),
        query.published,
        query.category.as_deref(),
        query.search.as_deref(),
    )
    .await?;

    let total = posts.len();
    let posts: Vec<Value> = posts
        .into_iter()
        .map(with_display_date)
        .collect::<Result<_, _>>()?;

    Ok(Json(ApiResponse::ok(
        "Blog posts retrieved successfully",
        json!({ "posts": posts, "total": total }),
    )))
}

/// Listing query: `category` of "all" (or empty) means no category filter;
/// `search` matches title, excerpt, or content as a literal,
/// case-insensitive substring. Newest first, capped at 50.
pub(crate) async fn query_posts(
    pool: &PgPool,
    published: bool,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<BlogPost>, sqlx::Error> {
    let category = category.filter(|c| !c.is_empty() && *c != "all");
    let search_pattern = search
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    sqlx::query_as::<_, BlogPost>(&format!(
        r#"
        SELECT {BLOG_COLUMNS}
        FROM blog_posts
        WHERE published = $1
          AND ($2::text IS NULL OR category = $2)
          AND ($3::text IS NULL
               OR title ILIKE $3
               OR excerpt ILIKE $3
               OR content ILIKE $3)
        ORDER BY created_at DESC
        LIMIT 50
        "#
    ))
    .bind(published)
    .bind(category)
    .bind(search_pattern)
    .fetch_all(pool)
    .await
}

/// GET /api/blog/{slug} - fetch a single published post
/// Unpublished posts are invisible here and return 404.
pub async fn get_blog_post(Path(slug): Path<String>) -> Result<Json<ApiResponse>, ApiError> {
    let pool = pool()?;

    let post = fetch_published_by_slug(pool.as_ref(), &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog post not found".to_string()))?;

    // Fire-and-forget view tracking; a counter failure never fails the read.
    if let Err(e) = record_increment(pool.as_ref(), CounterField::BlogViews).await {
        tracing::warn!(slug = %slug, "Failed to record blog view: {}", e);
    }

    Ok(Json(ApiResponse::ok(
        "Blog post retrieved successfully",
        serde_json::to_value(&post)?,
    )))
}

pub(crate) async fn fetch_published_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<BlogPost>, sqlx::Error> {
    sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {BLOG_COLUMNS} FROM blog_posts WHERE slug = $1 AND published = true"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
}

/// POST /api/blog - create a post with a generated unique slug
pub async fn create_blog_post(
    Json(payload): Json<BlogPostCreate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let base = validated_slug_base(&payload.title)?;
    let pool = pool()?;

    let (id, final_slug) = insert_post(pool.as_ref(), &payload, &base).await?;

    Ok(Json(ApiResponse::ok(
        "Blog post created successfully",
        json!({ "slug": final_slug, "id": id }),
    )))
}

/// Insert a post under the first free slug derived from `slug_base`.
/// The UNIQUE constraint is the collision signal: insert, and on a
/// duplicate slug retry with the next numeric suffix. Two concurrent
/// creations with the same title cannot both win the same slug.
pub(crate) async fn insert_post(
    pool: &PgPool,
    payload: &BlogPostCreate,
    slug_base: &str,
) -> Result<(Uuid, String), sqlx::Error> {
    let mut attempt = 0;
    loop {
        let candidate = slug::candidate(slug_base, attempt);
        let inserted = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            INSERT INTO blog_posts
                (id, title, slug, excerpt, content, author, category, tags, image, read_time, published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, slug
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&payload.title)
        .bind(&candidate)
        .bind(&payload.excerpt)
        .bind(&payload.content)
        .bind(DEFAULT_AUTHOR)
        .bind(&payload.category)
        .bind(&payload.tags)
        .bind(&payload.image)
        .bind(&payload.read_time)
        .bind(payload.published)
        .fetch_one(pool)
        .await;

        match inserted {
            Ok(row) => return Ok(row),
            Err(e) if is_unique_violation(&e) => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// PUT /api/blog/{id} - partial update; a changed title regenerates the slug
pub async fn update_blog_post(
    Path(id): Path<String>,
    Json(payload): Json<BlogPostUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let id = parse_post_id(&id)?;
    if let Some(ref title) = payload.title {
        validated_slug_base(title)?;
    }
    let pool = pool()?;

    let existing = sqlx::query_as::<_, BlogPost>(&format!(
        "SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or_else(|| ApiError::NotFound("Blog post not found".to_string()))?;

    if !apply_update(pool.as_ref(), existing, payload).await? {
        return Err(ApiError::NotFound("Blog post not found".to_string()));
    }

    Ok(Json(ApiResponse::ok_message(
        "Blog post updated successfully",
    )))
}

/// Merge `payload` over `existing` and write it back. Returns false when
/// the row vanished between the caller's fetch and the write.
///
/// The slug is regenerated only when the title is part of the update.
/// Updating a row to its own current slug never violates the unique index,
/// so renaming back to an earlier title keeps the clean slug; conflicts
/// with other posts retry with numeric suffixes.
pub(crate) async fn apply_update(
    pool: &PgPool,
    existing: BlogPost,
    payload: BlogPostUpdate,
) -> Result<bool, sqlx::Error> {
    let slug_base = match payload.title {
        Some(ref title) => slug::slugify(title),
        None => existing.slug.clone(),
    };

    let title = payload.title.unwrap_or(existing.title);
    let excerpt = payload.excerpt.unwrap_or(existing.excerpt);
    let content = payload.content.unwrap_or(existing.content);
    let category = payload.category.unwrap_or(existing.category);
    let tags = payload.tags.unwrap_or(existing.tags);
    let image = payload.image.unwrap_or(existing.image);
    let read_time = payload.read_time.unwrap_or(existing.read_time);
    let published = payload.published.unwrap_or(existing.published);

    let mut attempt = 0;
    loop {
        let candidate = slug::candidate(&slug_base, attempt);
        let result = sqlx::query(
            r#"
            UPDATE blog_posts
            SET title = $1, slug = $2, excerpt = $3, content = $4, category = $5,
                tags = $6, image = $7, read_time = $8, published = $9, updated_at = now()
            WHERE id = $10
            "#,
        )
        .bind(&title)
        .bind(&candidate)
        .bind(&excerpt)
        .bind(&content)
        .bind(&category)
        .bind(&tags)
        .bind(&image)
        .bind(&read_time)
        .bind(published)
        .bind(existing.id)
        .execute(pool)
        .await;

        match result {
            Ok(done) => return Ok(done.rows_affected() > 0),
            Err(e) if is_unique_violation(&e) => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// DELETE /api/blog/{id}
pub async fn delete_blog_post(Path(id): Path<String>) -> Result<Json<ApiResponse>, ApiError> {
    let id = parse_post_id(&id)?;
    let pool = pool()?;

    let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Blog post not found".to_string()));
    }

    Ok(Json(ApiResponse::ok_message(
        "Blog post deleted successfully",
    )))
}

fn parse_post_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Blog post not found".to_string()))
}

/// A title must survive slugification with something left: a blank or
/// punctuation-only title has no URL-safe representation.
fn validated_slug_base(title: &str) -> Result<String, ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    let base = slug::slugify(title);
    if base.is_empty() {
        return Err(ApiError::Validation(
            "Title must contain at least one letter or number".to_string(),
        ));
    }
    Ok(base)
}

/// Escape LIKE wildcards so search terms match literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Serialize a post and annotate it with the `date` display string the
/// frontend renders in listings.
fn with_display_date(post: BlogPost) -> Result<Value, serde_json::Error> {
    let date = post.created_at.format("%Y-%m-%d").to_string();
    let mut value = serde_json::to_value(&post)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("date".to_string(), Value::String(date));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    fn test_router() -> Router {
        Router::new()
            .route("/api/blog", get(get_blog_posts).post(create_blog_post))
            .route(
                "/api/blog/{key}",
                get(get_blog_post)
                    .put(update_blog_post)
                    .delete(delete_blog_post),
            )
    }

    fn sample_post() -> BlogPost {
        BlogPost {
            id: Uuid::nil(),
            title: "Hello World".to_string(),
            slug: "hello-world".to_string(),
            excerpt: "e".to_string(),
            content: "c".to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            category: "Business".to_string(),
            tags: vec!["Tips".to_string()],
            image: "https://example.com/img.png".to_string(),
            read_time: "3 min read".to_string(),
            published: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 16, 9, 0, 0).unwrap(),
        }
    }

    fn payload(title: &str, category: &str, published: bool) -> BlogPostCreate {
        BlogPostCreate {
            title: title.to_string(),
            excerpt: format!("{} excerpt", title),
            content: format!("{} content", title),
            category: category.to_string(),
            tags: vec![],
            image: "https://example.com/img.png".to_string(),
            read_time: "3 min read".to_string(),
            published,
        }
    }

    async fn create(pool: &PgPool, p: &BlogPostCreate) -> (Uuid, String) {
        insert_post(pool, p, &slug::slugify(&p.title)).await.unwrap()
    }

    #[test]
    fn test_display_date_derived_from_created_at() {
        let value = with_display_date(sample_post()).unwrap();
        assert_eq!(value["date"], "2025-01-15");
        // The original fields survive the annotation.
        assert_eq!(value["slug"], "hello-world");
        assert_eq!(value["readTime"], "3 min read");
    }

    #[test]
    fn test_escape_like_makes_wildcards_literal() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_list_query_defaults_to_published() {
        let query: BlogListQuery = serde_urlencoded_from("category=Productivity");
        assert!(query.published);
        assert_eq!(query.category.as_deref(), Some("Productivity"));
        assert!(query.search.is_none());
    }

    #[test]
    fn test_list_query_parses_published_override() {
        let query: BlogListQuery = serde_urlencoded_from("published=false&search=tools");
        assert!(!query.published);
        assert_eq!(query.search.as_deref(), Some("tools"));
    }

    fn serde_urlencoded_from(qs: &str) -> BlogListQuery {
        let uri: axum::http::Uri = format!("/api/blog?{}", qs).parse().unwrap();
        let Query(query) =
            Query::<BlogListQuery>::try_from_uri(&uri).expect("query should parse");
        query
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let req = Request::post("/api/blog")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"title":"   ","excerpt":"e","content":"c","category":"Business",
                    "image":"https://example.com/i.png","readTime":"1 min read"}"#,
            ))
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_rejects_punctuation_only_title() {
        // "!!!" slugifies to nothing, so there is no slug to assign.
        let req = Request::post("/api/blog")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"title":"!!!","excerpt":"e","content":"c","category":"Business",
                    "image":"https://example.com/i.png","readTime":"1 min read"}"#,
            ))
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_with_non_uuid_id_is_not_found() {
        let req = Request::put("/api/blog/hello-world")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"published":false}"#))
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_post_unavailable_without_pool() {
        let req = Request::get("/api/blog/hello-world")
            .body(Body::empty())
            .unwrap();
        let res = test_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[sqlx::test]
    async fn test_same_title_gets_suffixed_slugs(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        let p = payload("Hello World", "Business", true);

        let (first_id, first_slug) = create(&pool, &p).await;
        let (second_id, second_slug) = create(&pool, &p).await;
        let (_, third_slug) = create(&pool, &p).await;

        assert_eq!(first_slug, "hello-world");
        assert_eq!(second_slug, "hello-world-1");
        assert_eq!(third_slug, "hello-world-2");
        assert_ne!(first_id, second_id);
    }

    #[sqlx::test]
    async fn test_unpublished_post_is_invisible(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        create(&pool, &payload("Secret Draft", "Business", false)).await;

        // Invisible to the slug lookup and to the default listing.
        let by_slug = fetch_published_by_slug(&pool, "secret-draft").await.unwrap();
        assert!(by_slug.is_none());

        let published = query_posts(&pool, true, None, None).await.unwrap();
        assert!(published.is_empty());

        // Still reachable when drafts are requested explicitly.
        let drafts = query_posts(&pool, false, None, None).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].slug, "secret-draft");
    }

    #[sqlx::test]
    async fn test_category_filter_and_all_sentinel(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        create(&pool, &payload("Time Blocking", "Productivity", true)).await;
        create(&pool, &payload("Pricing Your Services", "Business", true)).await;

        let productivity = query_posts(&pool, true, Some("Productivity"), None)
            .await
            .unwrap();
        assert_eq!(productivity.len(), 1);
        assert_eq!(productivity[0].category, "Productivity");

        let all = query_posts(&pool, true, Some("all"), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let searched = query_posts(&pool, true, None, Some("pricing")).await.unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].slug, "pricing-your-services");
    }

    #[sqlx::test]
    async fn test_rename_regenerates_slug_without_spurious_suffix(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        let (id, _) = create(&pool, &payload("Hello World", "Business", true)).await;

        let fetch = |pool: PgPool| async move {
            sqlx::query_as::<_, BlogPost>(&format!(
                "SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = $1"
            ))
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap()
        };

        let existing = fetch(pool.clone()).await;
        let renamed = apply_update(
            &pool,
            existing,
            BlogPostUpdate {
                title: Some("Hello Rust".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(renamed);
        assert_eq!(fetch(pool.clone()).await.slug, "hello-rust");

        // Renaming back reclaims the original slug: the row's own previous
        // slug is free again and updating to it cannot self-collide.
        let existing = fetch(pool.clone()).await;
        apply_update(
            &pool,
            existing,
            BlogPostUpdate {
                title: Some("Hello World".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(fetch(pool.clone()).await.slug, "hello-world");
    }

    #[sqlx::test]
    async fn test_rename_onto_taken_title_gets_suffix(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        create(&pool, &payload("Hello World", "Business", true)).await;
        let (id, _) = create(&pool, &payload("Goodbye", "Business", true)).await;

        let existing = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();

        apply_update(
            &pool,
            existing,
            BlogPostUpdate {
                title: Some("Hello World".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let updated = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(updated.slug, "hello-world-1");
    }

    #[sqlx::test]
    async fn test_update_of_concurrently_deleted_post_reports_missing(pool: PgPool) {
        crate::db::run_migrations(&pool).await.unwrap();
        let (id, _) = create(&pool, &payload("Hello World", "Business", true)).await;

        let existing = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();

        // The row disappears after the existence check, as a concurrent
        // DELETE would make it.
        sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let found = apply_update(
            &pool,
            existing,
            BlogPostUpdate {
                published: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!found);
    }
}
