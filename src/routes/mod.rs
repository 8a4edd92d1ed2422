/**
 * Routes Module
 * API route handlers
 */
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub mod auth;
pub mod blog;
pub mod health;
pub mod users;

/// Error body shared by every route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Fallback for unmatched routes
pub async fn unknown_endpoint() -> ApiError {
    ApiError::UnknownEndpoint
}

/// JSON request body whose rejections are reported as [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Parse an `:id` path segment.
pub(crate) fn parse_id(raw: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|_| ApiError::MalformedId)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for driving the full router over a memory store.

    use axum::{
        body::{Body, Bytes},
        http::{Request, StatusCode},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::db::{
        models::{Blog, NewBlog, NewUser, User},
        BlogStore, MemoryStore,
    };
    use crate::routes::auth::AuthConfig;
    use crate::AppState;

    pub const TEST_SECRET: &str = "test-secret";

    pub struct TestApp {
        pub state: AppState,
        pub store: Arc<MemoryStore>,
    }

    impl TestApp {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let config = AuthConfig {
                secret: TEST_SECRET.to_string(),
                token_ttl_secs: 3600,
                password_cost: 4,
            };
            let state = AppState::new(store.clone(), &config);
            Self { state, store }
        }

        pub fn router(&self) -> Router {
            crate::create_app(self.state.clone())
        }

        pub async fn seed_user(&self, username: &str) -> User {
            self.store
                .create_user(NewUser {
                    username: username.to_string(),
                    name: Some(format!("{} name", username)),
                    password_hash: bcrypt::hash("sekret", 4).unwrap(),
                })
                .await
                .unwrap()
        }

        pub async fn seed_blog(&self, owner: Uuid, author: &str) -> Blog {
            self.store
                .create_blog(
                    owner,
                    NewBlog {
                        title: format!("A blog by {}", author),
                        author: Some(author.to_string()),
                        url: "http://example.com".to_string(),
                        likes: 3,
                    },
                )
                .await
                .unwrap()
        }

        pub fn token_for(&self, user: &User) -> String {
            self.state
                .keys
                .issue(user.id, &user.username)
                .unwrap()
        }

        pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
            let response = self.router().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, bytes)
        }
    }

    pub fn json_request(
        method: &str,
        uri: &str,
        token: Option<&str>,
        json: &serde_json::Value,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap()
    }

    /// Request with a verbatim body; `content_type` of `None` omits the header.
    pub fn raw_request(
        method: &str,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: &'static str,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body)).unwrap()
    }

    pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }
}
