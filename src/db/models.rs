//! Database Models - storage records for blogs and users (used by sqlx and the memory store).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Blog row
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub url: String,
    pub likes: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// New blog for insertion. The owner is passed separately.
#[derive(Debug, Clone)]
pub struct NewBlog {
    pub title: String,
    pub author: Option<String>,
    pub url: String,
    pub likes: i64,
}

/// Field replacements for an existing blog; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<i64>,
}

impl BlogChanges {
    /// Apply the replacements to a stored blog in place.
    pub fn apply_to(self, blog: &mut Blog) {
        if let Some(title) = self.title {
            blog.title = title;
        }
        if let Some(author) = self.author {
            blog.author = Some(author);
        }
        if let Some(url) = self.url {
            blog.url = url;
        }
        if let Some(likes) = self.likes {
            blog.likes = likes;
        }
    }
}

/// Public part of a user, embedded in blog listings
#[derive(Debug, Clone, PartialEq)]
pub struct Owner {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
}

/// Blog joined with its owner
#[derive(Debug, Clone)]
pub struct BlogWithOwner {
    pub blog: Blog,
    pub owner: Owner,
}

/// User row. `blogs` is the ordered list of blog ids appended at creation time.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub blogs: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// New user for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// User with the blogs it references, in append order
#[derive(Debug, Clone)]
pub struct UserWithBlogs {
    pub user: User,
    pub blogs: Vec<Blog>,
}
