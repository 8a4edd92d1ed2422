//! PostgreSQL-backed store.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::{collections::HashMap, time::Duration};
use uuid::Uuid;

use super::{
    models::{Blog, BlogChanges, BlogWithOwner, NewBlog, NewUser, Owner, User, UserWithBlogs},
    BlogStore, StoreError,
};

const BLOG_COLUMNS: &str = "id, title, author, url, likes, user_id, created_at";
const USER_COLUMNS: &str = "id, username, name, password_hash, blogs, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BlogOwnerRow {
    #[sqlx(flatten)]
    blog: Blog,
    username: String,
    name: Option<String>,
}

#[derive(FromRow)]
struct UserBlogRow {
    owner_id: Uuid,
    #[sqlx(flatten)]
    blog: Blog,
}

#[async_trait]
impl BlogStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let start = std::time::Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }

    async fn list_blogs(&self) -> Result<Vec<BlogWithOwner>, StoreError> {
        let rows = sqlx::query_as::<_, BlogOwnerRow>(
            r#"
            SELECT b.id, b.title, b.author, b.url, b.likes, b.user_id, b.created_at,
                   u.username, u.name
            FROM blogs b
            JOIN users u ON u.id = b.user_id
            ORDER BY b.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BlogWithOwner {
                owner: Owner {
                    id: row.blog.user_id,
                    username: row.username,
                    name: row.name,
                },
                blog: row.blog,
            })
            .collect())
    }

    async fn find_blog(&self, id: Uuid) -> Result<Option<Blog>, StoreError> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(blog)
    }

    async fn create_blog(&self, owner: Uuid, blog: NewBlog) -> Result<Blog, StoreError> {
        // Insert and owner update commit together; an early return rolls back.
        let mut tx = self.pool.begin().await?;

        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(StoreError::UnknownUser(owner));
        }

        let created = sqlx::query_as::<_, Blog>(&format!(
            r#"
            INSERT INTO blogs (title, author, url, likes, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(&blog.title)
        .bind(&blog.author)
        .bind(&blog.url)
        .bind(blog.likes)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET blogs = array_append(blogs, $1) WHERE id = $2")
            .bind(created.id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_blog(
        &self,
        id: Uuid,
        changes: BlogChanges,
    ) -> Result<Option<Blog>, StoreError> {
        let blog = sqlx::query_as::<_, Blog>(&format!(
            r#"
            UPDATE blogs
            SET title = COALESCE($1, title),
                author = COALESCE($2, author),
                url = COALESCE($3, url),
                likes = COALESCE($4, likes)
            WHERE id = $5
            RETURNING {BLOG_COLUMNS}
            "#
        ))
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(&changes.url)
        .bind(changes.likes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(blog)
    }

    async fn delete_blog(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match created {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateUsername(user.username))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_users(&self) -> Result<Vec<UserWithBlogs>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        // Dangling references (deleted blogs) drop out of the join.
        let rows = sqlx::query_as::<_, UserBlogRow>(
            r#"
            SELECT u.id AS owner_id,
                   b.id, b.title, b.author, b.url, b.likes, b.user_id, b.created_at
            FROM users u
            CROSS JOIN LATERAL unnest(u.blogs) WITH ORDINALITY AS refs(blog_id, position)
            JOIN blogs b ON b.id = refs.blog_id
            ORDER BY u.id, refs.position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_owner: HashMap<Uuid, Vec<Blog>> = HashMap::new();
        for row in rows {
            by_owner.entry(row.owner_id).or_default().push(row.blog);
        }

        Ok(users
            .into_iter()
            .map(|user| UserWithBlogs {
                blogs: by_owner.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
