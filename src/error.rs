//! API errors and their translation into HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;

use crate::db::StoreError;
use crate::routes::ErrorResponse;

/// Every failure a handler can report to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("malformatted id")]
    MalformedId,

    #[error(transparent)]
    BadBody(#[from] JsonRejection),

    #[error("token missing or invalid")]
    Unauthorized,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("unauthorized request")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("unknown endpoint")]
    UnknownEndpoint,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadBody(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Validation(_) | ApiError::MalformedId | ApiError::BadBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound | ApiError::UnknownEndpoint => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::DuplicateUsername(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::UnknownUser(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Store(StoreError::Database(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Server-side details stay in the logs.
    fn client_message(&self) -> String {
        match self {
            ApiError::Store(StoreError::DuplicateUsername(_)) => {
                "expected `username` to be unique".to_string()
            }
            // The token names a user that no longer exists.
            ApiError::Store(StoreError::UnknownUser(_)) => ApiError::Unauthorized.to_string(),
            ApiError::Store(StoreError::Database(_)) | ApiError::Internal(_) => {
                "internal server error".to_string()
            }
            ApiError::BadBody(rejection) => rejection.body_text(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        // Missing blogs answer with a bare 404.
        if matches!(self, ApiError::NotFound) {
            return status.into_response();
        }

        (
            status,
            Json(ErrorResponse {
                error: self.client_message(),
            }),
        )
            .into_response()
    }
}

/// Turns a handler panic into the generic 500 response.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::Internal(detail).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_of(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("title is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::MalformedId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Store(StoreError::DuplicateUsername("root".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Store(StoreError::UnknownUser(Uuid::nil())).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_not_found_has_empty_body() {
        let (status, body) = body_of(ApiError::NotFound.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_body() {
        let (status, body) = body_of(ApiError::Forbidden.into_response()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, r#"{"error":"unauthorized request"}"#);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let err = ApiError::Internal("connection reset by peer".into());
        let (status, body) = body_of(err.into_response()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"internal server error"}"#);
    }

    #[tokio::test]
    async fn test_panic_payload_becomes_500() {
        let response = handle_panic(Box::new("boom"));
        let (status, body) = body_of(response).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("boom"));
    }
}
