/**
 * Authentication Routes
 * Bearer token issuing (login) and verification
 */
use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    Json,
};
use bcrypt::DEFAULT_COST;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{env_or, error::ApiError, routes::ApiJson, AppState};

// ============================================================================
// Configuration
// ============================================================================

/// Placeholder secret for local development; refused in production.
pub const DEFAULT_SECRET: &str = "default-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl_secs: i64,
    pub password_cost: u32,
}

impl AuthConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.secret.is_empty() || self.secret == DEFAULT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: std::env::var("SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string()),
            token_ttl_secs: env_or("TOKEN_TTL_SECS", 3600),
            password_cost: env_or("BCRYPT_COST", DEFAULT_COST),
        }
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub username: String,
    pub id: String, // User ID
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the configured secret
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::seconds(config.token_ttl_secs),
        }
    }

    /// Create a signed token for the given user.
    pub fn issue(&self, user_id: Uuid, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            username: username.to_string(),
            id: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify the signature and expiry of a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
/// The scheme is matched case-insensitively.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..7)?;
    if !scheme.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = value.get(7..)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Identity of the caller, taken from a verified bearer token.
///
/// Handlers that need authentication take this as a parameter; the request
/// is rejected with 401 before the handler runs when the token is missing or
/// invalid.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        let claims = state.keys.verify(token).map_err(|e| {
            tracing::info!(error.msg = %e, "Failed to decode token");
            ApiError::Unauthorized
        })?;

        let id = Uuid::parse_str(&claims.id).map_err(|_| ApiError::Unauthorized)?;

        Ok(AuthUser {
            id,
            username: claims.username,
        })
    }
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub name: Option<String>,
}

/// POST /api/login
/// Exchange username and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.store.find_user_by_username(&payload.username).await?;

    // bcrypt is CPU-bound; keep the async executor free.
    let password_ok = match &user {
        Some(user) => {
            let password = payload.password;
            let hash = user.password_hash.clone();
            tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash).unwrap_or(false))
                .await
                .unwrap_or(false)
        }
        None => false,
    };

    let user = match user {
        Some(user) if password_ok => user,
        _ => {
            tracing::warn!(username = %payload.username, "Failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let token = state
        .keys
        .issue(user.id, &user.username)
        .map_err(|e| ApiError::Internal(format!("failed to create token: {}", e)))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        name: user.name,
    }))
}
