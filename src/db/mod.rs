pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::env_or;

use self::models::{Blog, BlogChanges, BlogWithOwner, NewBlog, NewUser, User, UserWithBlogs};

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    /// Read the configuration from the environment.
    ///
    /// Returns `None` when no database URL is configured. With `ENVIRONMENT=test`
    /// the URL is taken from `TEST_DATABASE_URL` instead of `DATABASE_URL`.
    pub fn from_env() -> Option<Self> {
        let url_var = if std::env::var("ENVIRONMENT").as_deref() == Ok("test") {
            "TEST_DATABASE_URL"
        } else {
            "DATABASE_URL"
        };
        let url = std::env::var(url_var).ok().filter(|s| !s.is_empty())?;
        Some(Self {
            url,
            ..Self::default()
        })
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/bloglist".to_string()),
            max_connections: env_or("DB_POOL_MAX", 10),
            min_connections: env_or("DB_POOL_MIN", 2),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT", 10),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", 300),
        }
    }
}

/// Errors raised by a [`BlogStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("username `{0}` is already taken")]
    DuplicateUsername(String),

    #[error("user {0} does not exist")]
    UnknownUser(Uuid),
}

/// Persistence operations for blogs and users.
///
/// Implementations must make `create_blog` atomic: either the blog is stored
/// and appended to its owner's `blogs` list, or nothing is written.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// Short name of the backend, reported by the health endpoints.
    fn backend(&self) -> &'static str;

    /// Round-trip to the backend, returning its latency.
    async fn ping(&self) -> Result<Duration, StoreError>;

    async fn list_blogs(&self) -> Result<Vec<BlogWithOwner>, StoreError>;

    async fn find_blog(&self, id: Uuid) -> Result<Option<Blog>, StoreError>;

    /// Store a blog owned by `owner` and append it to the owner's `blogs`.
    /// Fails with [`StoreError::UnknownUser`] when the owner does not exist.
    async fn create_blog(&self, owner: Uuid, blog: NewBlog) -> Result<Blog, StoreError>;

    /// Returns `None` when no blog has the given id.
    async fn update_blog(&self, id: Uuid, changes: BlogChanges)
        -> Result<Option<Blog>, StoreError>;

    /// Returns whether a blog was removed. The owner's `blogs` list is left untouched.
    async fn delete_blog(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn list_users(&self) -> Result<Vec<UserWithBlogs>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

pub async fn init_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            username TEXT UNIQUE NOT NULL,
            name TEXT,
            password_hash TEXT NOT NULL,
            blogs UUID[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blogs (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            title TEXT NOT NULL,
            author TEXT,
            url TEXT NOT NULL,
            likes BIGINT NOT NULL DEFAULT 0,
            user_id UUID NOT NULL REFERENCES users(id),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    // Several statements in one string need the simple query protocol.
    sqlx::raw_sql(
        r#"
        CREATE INDEX IF NOT EXISTS idx_blogs_user_id ON blogs(user_id);
        CREATE INDEX IF NOT EXISTS idx_blogs_created_at ON blogs(created_at)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default_uses_env_or_fallback() {
        let config = DbConfig::default();
        assert!(config.max_connections >= 1);
        assert!(config.connect_timeout_secs >= 1);
        assert!(config.idle_timeout_secs >= 1);
        assert!(!config.url.is_empty());
    }

    #[test]
    fn test_store_error_messages() {
        let err = StoreError::DuplicateUsername("root".to_string());
        assert_eq!(err.to_string(), "username `root` is already taken");

        let id = Uuid::nil();
        let err = StoreError::UnknownUser(id);
        assert_eq!(err.to_string(), format!("user {} does not exist", id));
    }
}
