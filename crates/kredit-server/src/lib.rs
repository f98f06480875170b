//! Kredit Web Server
//!
//! Axum-based REST API for the Kredit spending tracker.
//!
//! Security features:
//! - Bearer-token authentication on every `/api` route
//! - Restrictive CORS policy (configured origins only)
//! - Upload size limits
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use kredit_core::ai::{ExtractorClient, InvoiceExtractor};
use kredit_core::db::Database;

pub mod auth;
mod handlers;

pub use auth::{AuthError, AuthUser, Claims, TokenService};

/// Maximum file upload size (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Signing secret used when `KREDIT_SECRET_KEY` is unset
pub const DEFAULT_SECRET_KEY: &str = "dev_secret";

/// Environment variable for the token signing secret
pub const SECRET_KEY_ENV: &str = "KREDIT_SECRET_KEY";

/// Environment variable for comma-separated CORS origins
pub const ALLOWED_ORIGINS_ENV: &str = "KREDIT_ALLOWED_ORIGINS";

/// CORS origins when `KREDIT_ALLOWED_ORIGINS` is unset (local frontend dev server)
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_SECRET_KEY.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    /// Build from `KREDIT_SECRET_KEY` and `KREDIT_ALLOWED_ORIGINS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
            if !secret.is_empty() {
                config.jwt_secret = secret;
            }
        }

        if let Ok(origins) = std::env::var(ALLOWED_ORIGINS_ENV) {
            config.allowed_origins = parse_origins(&origins);
        }

        config
    }
}

/// Parse a comma-separated origin list
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub tokens: TokenService,
    /// None when no extraction backend is configured
    pub extractor: Option<ExtractorClient>,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let extractor = ExtractorClient::from_env();
    match extractor {
        Some(ref client) => info!(
            "Extraction backend configured: {} (model: {})",
            client.name(),
            client.model()
        ),
        None => info!("ℹ️  Extraction backend not configured (set GEMINI_API_KEY to enable invoice uploads)"),
    }

    create_router_with_options(db, config, extractor)
}

/// Create the application router with an explicit extractor (for testing)
pub fn create_router_with_options(
    db: Database,
    config: ServerConfig,
    extractor: Option<ExtractorClient>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        tokens: TokenService::new(&config.jwt_secret),
        config: config.clone(),
        extractor,
    });

    let api_routes = Router::new()
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/categories/:id", delete(handlers::delete_category))
        // Invoices
        .route(
            "/invoices",
            post(handlers::upload_invoice)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024)),
        )
        // Spendings
        .route(
            "/spendings",
            get(handlers::list_spendings).patch(handlers::bulk_update_spendings),
        )
        .route("/spendings/:id", patch(handlers::update_spending))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Turn a handler panic into a sanitized 500
fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("Handler panicked");
    AppError::internal("An internal error occurred").into_response()
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::from_env()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.jwt_secret == DEFAULT_SECRET_KEY {
        warn!("⚠️  Using the development token secret - set {} before exposing to network!", SECRET_KEY_ENV);
    }

    // Check extraction backend
    check_extractor().await;

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log extraction backend status
async fn check_extractor() {
    match ExtractorClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ Extraction backend reachable: {} (model: {})",
                    client.name(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  Extraction backend configured but not responding: {} (model: {})",
                    client.name(),
                    client.model()
                );
            }
        }
        None => {
            info!("ℹ️  Extraction backend not configured (set GEMINI_API_KEY to enable invoice uploads)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn forbidden(msg: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error to a response, keeping domain messages visible
    fn from_core(err: kredit_core::Error) -> Self {
        use kredit_core::Error;

        match err {
            Error::BadFilter(_)
            | Error::EmptyUpload
            | Error::DuplicateCategory(_)
            | Error::InvalidData(_) => Self::bad_request(&err.to_string()),
            Error::NotFound(_) => Self::not_found(&err.to_string()),
            Error::ProtectedCategory => Self::forbidden(&err.to_string()),
            Error::MissingFallback(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
                internal: None,
            },
            Error::Extraction(ref msg) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("Error processing invoice: {}", msg),
                internal: Some(err.into()),
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(other.into()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        match err.downcast::<kredit_core::Error>() {
            Ok(core) => Self::from_core(core),
            Err(err) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(err),
            },
        }
    }
}

#[cfg(test)]
mod tests;
