//! Health and login handlers

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{AppError, AppState};

/// Response for GET /health
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Liveness probe (no auth)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
}

/// POST /auth/login - Exchange credentials for a bearer token
///
/// Seeds the default categories on a user's first login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<LoginResponse>, AppError> {
    let req: LoginRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let (username, password) = match (req.username, req.password) {
        (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => (u, p),
        _ => return Err(AppError::bad_request("Username and password are required")),
    };

    let user = match state.db.verify_credentials(username.trim(), &password)? {
        Some(user) => user,
        None => {
            warn!(username = %username.trim(), "Failed login attempt");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
    };

    let seeded = state.db.ensure_default_categories(user.id)?;
    if seeded > 0 {
        info!(user_id = user.id, seeded, "First login, seeded default categories");
    }

    let token = state.tokens.issue_token(user.id)?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
    }))
}
