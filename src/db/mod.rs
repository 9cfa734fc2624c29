pub mod models;

use chrono::{TimeZone, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tokio::sync::OnceCell;

static DB_POOL: OnceCell<Arc<PgPool>> = OnceCell::const_new();

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/portfolio_db".to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

pub async fn init_pool(config: Option<DbConfig>) -> Result<Arc<PgPool>, sqlx::Error> {
    let config = config.unwrap_or_default();

    tracing::info!("Initializing database connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    let pool = Arc::new(pool);
    let _ = DB_POOL.set(pool.clone());

    Ok(pool)
}

pub fn get_pool() -> Option<Arc<PgPool>> {
    DB_POOL.get().cloned()
}

pub async fn health_check() -> Result<std::time::Duration, sqlx::Error> {
    let pool = get_pool()
        .ok_or_else(|| sqlx::Error::Configuration("Database pool not initialized".into()))?;

    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool.as_ref()).await?;

    Ok(start.elapsed())
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            title TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            location TEXT NOT NULL,
            bio TEXT NOT NULL,
            profile_image TEXT NOT NULL,
            linkedin TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            replied_at TIMESTAMPTZ
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_contacts_created_at
            ON contacts(created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_posts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            slug TEXT UNIQUE NOT NULL,
            excerpt TEXT NOT NULL,
            content TEXT NOT NULL,
            author TEXT NOT NULL,
            category TEXT NOT NULL,
            tags TEXT[] NOT NULL DEFAULT '{}',
            image TEXT NOT NULL,
            read_time TEXT NOT NULL,
            published BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::raw_sql(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_blog_posts_slug
            ON blog_posts(slug);
        CREATE INDEX IF NOT EXISTS idx_blog_posts_published
            ON blog_posts(published);
        CREATE INDEX IF NOT EXISTS idx_blog_posts_created_at
            ON blog_posts(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_blog_posts_pub_created
            ON blog_posts(published, created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analytics (
            id TEXT PRIMARY KEY,
            website_views BIGINT NOT NULL DEFAULT 0,
            blog_views BIGINT NOT NULL DEFAULT 0,
            contact_inquiries BIGINT NOT NULL DEFAULT 0,
            social_media_followers BIGINT NOT NULL DEFAULT 0,
            date TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

/// Insert default content into empty collections. Safe to run on every
/// startup: each block checks "does any row exist", not a specific id.
pub async fn seed_defaults(pool: &PgPool) -> Result<(), sqlx::Error> {
    let (profile_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profile")
        .fetch_one(pool)
        .await?;
    if profile_count == 0 {
        sqlx::query(
            r#"
            INSERT INTO profile (id, name, title, email, phone, location, bio, profile_image, linkedin)
            VALUES ('default', $1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind("Nelbert Tomicos")
        .bind("General Virtual Assistant")
        .bind("nelberttomicos@gmail.com")
        .bind("+63 975-912-0840")
        .bind("Mandaue City, Cebu, Philippines")
        .bind(
            "I'm a resourceful and detail-oriented General Virtual Assistant with a passion for \
             helping businesses run smoothly and smartly. I thrive in creating order out of chaos - \
             whether it's managing schedules, handling customer interactions, or streamlining workflows.",
        )
        .bind("https://customer-assets.emergentagent.com/profile-photo.jpeg")
        .bind("https://www.linkedin.com/in/nelbertt")
        .execute(pool)
        .await?;
        tracing::info!("Default profile created");
    }

    let (analytics_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analytics")
        .fetch_one(pool)
        .await?;
    if analytics_count == 0 {
        sqlx::query(
            r#"
            INSERT INTO analytics (id, website_views, blog_views, contact_inquiries, social_media_followers, date)
            VALUES ('current', 0, 0, 0, 0, now())
            "#,
        )
        .execute(pool)
        .await?;
        tracing::info!("Default analytics created");
    }

    let (blog_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts")
        .fetch_one(pool)
        .await?;
    if blog_count == 0 {
        for post in sample_posts() {
            sqlx::query(
                r#"
                INSERT INTO blog_posts
                    (title, slug, excerpt, content, author, category, tags, image, read_time, published, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, true, $10, $10)
                "#,
            )
            .bind(post.title)
            .bind(post.slug)
            .bind(post.excerpt)
            .bind(post.content)
            .bind("Nelbert Tomicos")
            .bind(post.category)
            .bind(post.tags)
            .bind(post.image)
            .bind(post.read_time)
            .bind(post.created_at)
            .execute(pool)
            .await?;
        }
        tracing::info!("Sample blog posts created");
    }

    Ok(())
}

struct SamplePost {
    title: &'static str,
    slug: &'static str,
    excerpt: &'static str,
    content: &'static str,
    category: &'static str,
    tags: Vec<String>,
    image: &'static str,
    read_time: &'static str,
    created_at: chrono::DateTime<Utc>,
}

fn sample_posts() -> Vec<SamplePost> {
    vec![
        SamplePost {
            title: "5 Essential Tools Every Virtual Assistant Should Master in 2025",
            slug: "5-essential-tools-virtual-assistant-2025",
            excerpt: "Discover the must-have tools that will elevate your VA game and help you \
                      deliver exceptional results to your clients.",
            content: "As a Virtual Assistant, staying ahead of the curve with the right tools is \
                      crucial for success. Here are the top 5 tools that have transformed my \
                      workflow and helped me deliver outstanding results...",
            category: "Productivity",
            tags: to_tags(&["Tools", "Productivity", "Virtual Assistant", "Technology"]),
            image: "https://images.unsplash.com/photo-1611224923853-80b023f02d71?auto=format&fit=crop&w=1200&q=80",
            read_time: "5 min read",
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
        },
        SamplePost {
            title: "Building Strong Client Relationships: A VA's Guide to Success",
            slug: "building-strong-client-relationships-va-guide",
            excerpt: "Learn the key strategies I use to build trust, communicate effectively, and \
                      maintain long-term partnerships with clients.",
            content: "Building strong client relationships is the foundation of a successful \
                      virtual assistant career. Throughout my experience working with various \
                      clients, I've learned that trust and communication are paramount...",
            category: "Business",
            tags: to_tags(&["Client Relations", "Communication", "Business Growth", "Tips"]),
            image: "https://images.unsplash.com/photo-1600880292203-757bb62b4baf?auto=format&fit=crop&w=1200&q=80",
            read_time: "7 min read",
            created_at: Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
        },
        SamplePost {
            title: "Social Media Management for Small Businesses: Best Practices",
            slug: "social-media-management-small-businesses",
            excerpt: "Effective social media strategies that help small businesses grow their \
                      online presence and engage with their audience.",
            content: "Social media management is more than just posting content. It's about \
                      creating meaningful connections with your audience and building a community \
                      around your brand...",
            category: "Social Media",
            tags: to_tags(&["Social Media", "Marketing", "Small Business", "Strategy"]),
            image: "https://images.unsplash.com/photo-1611162617474-5b21e879e113?auto=format&fit=crop&w=1200&q=80",
            read_time: "6 min read",
            created_at: Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
        },
    ]
}

fn to_tags(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
}
