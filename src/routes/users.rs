/**
 * User Routes
 * Account creation and listing
 */
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Blog, NewUser, User, UserWithBlogs};
use crate::error::ApiError;
use crate::routes::ApiJson;
use crate::AppState;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 3;

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Blog summary embedded in user listings
#[derive(Debug, Serialize, Deserialize)]
pub struct UserBlogSummary {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub id: Uuid,
}

impl From<Blog> for UserBlogSummary {
    fn from(blog: Blog) -> Self {
        Self {
            url: blog.url,
            title: blog.title,
            author: blog.author,
            id: blog.id,
        }
    }
}

/// User as returned to clients; the password hash never leaves the store.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub blogs: Vec<UserBlogSummary>,
}

impl UserResponse {
    fn new(user: User, blogs: Vec<Blog>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            blogs: blogs.into_iter().map(UserBlogSummary::from).collect(),
        }
    }
}

impl From<UserWithBlogs> for UserResponse {
    fn from(entry: UserWithBlogs) -> Self {
        Self::new(entry.user, entry.blogs)
    }
}

fn required_min_len(value: Option<String>, field: &str, min: usize) -> Result<String, ApiError> {
    match value {
        Some(v) if v.chars().count() >= min => Ok(v),
        Some(_) => Err(ApiError::Validation(format!(
            "{} must be at least {} characters long",
            field, min
        ))),
        None => Err(ApiError::Validation(format!("{} is required", field))),
    }
}

/// POST /api/users - Create a user
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = required_min_len(payload.username, "username", MIN_USERNAME_LEN)?;
    let password = required_min_len(payload.password, "password", MIN_PASSWORD_LEN)?;

    // bcrypt is intentionally CPU-intensive; run it outside the async executor.
    let cost = state.password_cost;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {}", e)))?;

    let user = state
        .store
        .create_user(NewUser {
            username,
            name: payload.name,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::new(user, Vec::new()))))
}

/// GET /api/users - List users with their blogs
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
