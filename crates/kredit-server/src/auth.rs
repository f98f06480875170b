//! Bearer-token authentication
//!
//! Tokens are HS256 JWTs carrying the user id. The gate only checks the
//! signature and expiry; it never touches the database.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::AppState;

/// Token lifetime
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer ...` header
    #[error("missing bearer token")]
    MissingToken,

    /// Bad signature, malformed, or expired
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Authentication required" })),
            )
                .into_response(),
            AuthError::Signing(e) => {
                tracing::error!(error = %e, "Token signing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "An internal error occurred" })),
                )
                    .into_response()
            }
        }
    }
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues and verifies bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    /// Issue a token for a user, valid for 24 hours
    pub fn issue_token(&self, user_id: i64) -> Result<String, AuthError> {
        self.issue_token_with_ttl(user_id, self.ttl)
    }

    pub(crate) fn issue_token_with_ttl(
        &self,
        user_id: i64,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a raw token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Resolve the `Authorization` header to a user id
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<i64, AuthError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.verify_token(token).map(|claims| claims.user_id)
    }
}

/// Identity placed in request extensions by `auth_middleware`
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Authentication middleware for `/api` routes
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.tokens.authenticate(request.headers()) {
        Ok(user_id) => {
            debug!(user_id, path = %request.uri().path(), "Authenticated request");
            request.extensions_mut().insert(AuthUser { user_id });
            next.run(request).await
        }
        Err(e) => {
            warn!(error = %e, path = %request.uri().path(), "Unauthorized request");
            e.into_response()
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AuthError::MissingToken)
    }
}
