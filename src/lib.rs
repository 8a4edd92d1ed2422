//! Bloglist Backend - library for app logic and testing

pub mod db;
pub mod error;
pub mod logging;
pub mod routes;

use anyhow::Context;
use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::db::{BlogStore, DbConfig, MemoryStore, PgStore};
use crate::logging::config::LoggingConfig;
use crate::routes::auth::{AuthConfig, TokenKeys};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub keys: Arc<TokenKeys>,
    pub password_cost: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn BlogStore>, auth: &AuthConfig) -> Self {
        Self {
            store,
            keys: Arc::new(TokenKeys::new(auth)),
            password_cost: auth.password_cost,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back
/// to the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect::<Vec<HeaderValue>>()
        })
        .filter(|origins| !origins.is_empty())
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/blogs",
            get(routes::blog::list_blogs).post(routes::blog::create_blog),
        )
        .route(
            "/api/blogs/{id}",
            get(routes::blog::get_blog)
                .put(routes::blog::update_blog)
                .delete(routes::blog::delete_blog),
        )
        .route(
            "/api/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route("/api/login", post(routes::auth::login))
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/detailed", get(routes::health::health_detailed))
        .fallback(routes::unknown_endpoint)
        .with_state(state)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Global 1 MB request body cap
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(configure_cors())
}

/// Pick the store: PostgreSQL when a database URL is configured, memory otherwise.
async fn connect_store() -> anyhow::Result<Arc<dyn BlogStore>> {
    match DbConfig::from_env() {
        Some(config) => {
            let pool = db::init_pool(&config)
                .await
                .context("failed to connect to the database")?;
            db::run_migrations(&pool)
                .await
                .context("failed to run database migrations")?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::info!("DATABASE_URL not set. Using the in-memory store.");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_config = LoggingConfig::default();
    let _log_guards = logging::init(&log_config);

    routes::health::init_start_time();

    let auth_config = AuthConfig::default();
    if log_config.is_production() && auth_config.uses_default_secret() {
        anyhow::bail!("SECRET must be set to a unique value in production");
    }

    let store = connect_store().await?;
    tracing::info!(backend = store.backend(), "Store ready");

    let app = create_app(AppState::new(store, &auth_config));

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env_or("PORT", 3003);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid HOST/PORT configuration: {}:{}", host, port))?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
