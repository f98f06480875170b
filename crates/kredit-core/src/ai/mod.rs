//! Pluggable invoice extraction abstraction
//!
//! The ingestion workflow hands an extractor the raw file and the user's
//! category names, and gets back structured spending candidates. The contract
//! (`ExtractionRequest` / `SpendingCandidate`) is versioned and independent of
//! the provider.
//!
//! # Architecture
//!
//! - `InvoiceExtractor` trait: the interface every extractor implements
//! - `ExtractorClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (gemini, mock). Default: gemini
//! - `GEMINI_API_KEY`: API key (required for gemini backend)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.5-flash-lite)
//! - `GEMINI_API_BASE`: API base URL (default: Google's public endpoint)
//! - `EXTRACTION_TIMEOUT_SECS`: HTTP timeout (default: 60)

mod gemini;
mod mock;
pub mod parsing;
pub mod prompt;
pub mod types;

pub use gemini::{
    GeminiBackend, API_KEY_HEADER, DEFAULT_GEMINI_MODEL, DEFAULT_TIMEOUT_SECS, GEMINI_API_BASE,
};
pub use mock::MockBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all invoice extractors
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait InvoiceExtractor: Send + Sync {
    /// Extract spending candidates from an invoice file
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<SpendingCandidate>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Backend name (for logging)
    fn name(&self) -> &str;

    /// Model name (for logging)
    fn model(&self) -> &str;
}

/// Concrete extractor client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ExtractorClient {
    /// Google Gemini (HTTP API)
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl ExtractorClient {
    /// Create an extractor client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `gemini` (default): Uses GEMINI_API_KEY and GEMINI_MODEL
    /// - `mock`: Creates a mock backend that extracts nothing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "gemini".to_string());

        match backend.to_lowercase().as_str() {
            "gemini" => GeminiBackend::from_env().map(ExtractorClient::Gemini),
            "mock" => Some(ExtractorClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to gemini");
                GeminiBackend::from_env().map(ExtractorClient::Gemini)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        ExtractorClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl InvoiceExtractor for ExtractorClient {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<SpendingCandidate>> {
        match self {
            ExtractorClient::Gemini(b) => b.extract(request).await,
            ExtractorClient::Mock(b) => b.extract(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ExtractorClient::Gemini(b) => b.health_check().await,
            ExtractorClient::Mock(b) => b.health_check().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            ExtractorClient::Gemini(b) => b.name(),
            ExtractorClient::Mock(b) => b.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            ExtractorClient::Gemini(b) => b.model(),
            ExtractorClient::Mock(b) => b.model(),
        }
    }
}
