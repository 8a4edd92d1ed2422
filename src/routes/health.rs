/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Store check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detailed health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub database: ServiceCheck,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

async fn check_store(state: &AppState) -> ServiceCheck {
    let backend = state.store.backend().to_string();
    match state.store.ping().await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            backend,
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => ServiceCheck {
            status: "unhealthy".to_string(),
            backend,
            response_time: None,
            error: Some(e.to_string()),
        },
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/database - Store round-trip
pub async fn health_database(State(state): State<AppState>) -> Json<ServiceCheck> {
    Json(check_store(&state).await)
}

/// GET /health/detailed - Uptime plus the store check
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let database = check_store(&state).await;

    // The process answers even when the store does not.
    let status = if database.status == "healthy" {
        "ok"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        uptime: SERVER_START.elapsed().as_secs(),
        database,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::{empty_request, TestApp};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        init_start_time();
        let app = TestApp::new();
        let (status, bytes) = app.send(empty_request("GET", "/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        let body: SimpleHealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_database_reports_memory_backend() {
        let app = TestApp::new();
        let (status, bytes) = app.send(empty_request("GET", "/health/database", None)).await;
        assert_eq!(status, StatusCode::OK);
        let body: ServiceCheck = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "healthy");
        assert_eq!(body.backend, "memory");
        assert!(body.response_time.is_some());
    }

    #[tokio::test]
    async fn test_health_detailed_returns_ok() {
        init_start_time();
        let app = TestApp::new();
        let (status, bytes) = app.send(empty_request("GET", "/health/detailed", None)).await;
        assert_eq!(status, StatusCode::OK);
        let body: DetailedHealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.database.status, "healthy");
    }

    #[test]
    fn test_service_check_omits_empty_fields() {
        let check = ServiceCheck {
            status: "healthy".to_string(),
            backend: "memory".to_string(),
            response_time: Some(1),
            error: None,
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["responseTime"], 1);
        assert!(json.get("error").is_none());
    }
}
