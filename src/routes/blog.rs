/**
 * Blog Routes
 * CRUD API endpoints for blogs
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Blog, BlogChanges, BlogWithOwner, NewBlog};
use crate::error::ApiError;
use crate::routes::{auth::AuthUser, parse_id, ApiJson};
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Single blog; `user` is the owner's id
#[derive(Debug, Serialize, Deserialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub url: String,
    pub likes: i64,
    pub user: Uuid,
}

impl From<Blog> for BlogResponse {
    fn from(blog: Blog) -> Self {
        Self {
            id: blog.id,
            title: blog.title,
            author: blog.author,
            url: blog.url,
            likes: blog.likes,
            user: blog.user_id,
        }
    }
}

/// Owner summary embedded in list items
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub id: Uuid,
}

/// Blog list item (for GET /api/blogs)
#[derive(Debug, Serialize, Deserialize)]
pub struct BlogListItem {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub url: String,
    pub likes: i64,
    pub user: OwnerSummary,
}

impl From<BlogWithOwner> for BlogListItem {
    fn from(entry: BlogWithOwner) -> Self {
        let BlogWithOwner { blog, owner } = entry;
        Self {
            id: blog.id,
            title: blog.title,
            author: blog.author,
            url: blog.url,
            likes: blog.likes,
            user: OwnerSummary {
                username: owner.username,
                name: owner.name,
                id: owner.id,
            },
        }
    }
}

/// Request body for POST /api/blogs.
/// Every field is optional here so presence can be checked by the handler.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct CreateBlogRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<i64>,
}

/// Request body for PUT /api/blogs/:id
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub likes: Option<i64>,
}

impl From<UpdateBlogRequest> for BlogChanges {
    fn from(req: UpdateBlogRequest) -> Self {
        Self {
            title: req.title,
            author: req.author,
            url: req.url,
            likes: req.likes,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{} is required", field))),
    }
}

impl CreateBlogRequest {
    fn into_new_blog(self) -> Result<NewBlog, ApiError> {
        Ok(NewBlog {
            title: required(self.title, "title")?,
            url: required(self.url, "url")?,
            author: self.author,
            likes: self.likes.unwrap_or(0),
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blogs - List all blogs with their owners
pub async fn list_blogs(State(state): State<AppState>) -> Result<Json<Vec<BlogListItem>>, ApiError> {
    let blogs = state.store.list_blogs().await?;
    Ok(Json(blogs.into_iter().map(BlogListItem::from).collect()))
}

/// GET /api/blogs/:id - Get a single blog
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlogResponse>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.find_blog(id).await? {
        Some(blog) => Ok(Json(blog.into())),
        None => Err(ApiError::NotFound),
    }
}

/// POST /api/blogs - Create a blog owned by the caller (auth required)
pub async fn create_blog(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<CreateBlogRequest>,
) -> Result<(StatusCode, Json<BlogResponse>), ApiError> {
    let new_blog = payload.into_new_blog()?;

    let blog = state.store.create_blog(auth.id, new_blog).await?;

    tracing::info!(blog_id = %blog.id, user_id = %auth.id, "Blog created");

    Ok((StatusCode::CREATED, Json(blog.into())))
}

/// PUT /api/blogs/:id - Replace the given fields of a blog (no auth)
pub async fn update_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateBlogRequest>,
) -> Result<Json<BlogResponse>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.update_blog(id, payload.into()).await? {
        Some(blog) => Ok(Json(blog.into())),
        None => Err(ApiError::NotFound),
    }
}

/// DELETE /api/blogs/:id - Delete a blog (owner only)
pub async fn delete_blog(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;

    let blog = state.store.find_blog(id).await?.ok_or(ApiError::NotFound)?;

    if blog.user_id != auth.id {
        tracing::warn!(blog_id = %id, user_id = %auth.id, "Delete refused for non-owner");
        return Err(ApiError::Forbidden);
    }

    if !state.store.delete_blog(id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(blog_id = %id, user_id = %auth.id, "Blog deleted");

    Ok(StatusCode::NO_CONTENT)
}
