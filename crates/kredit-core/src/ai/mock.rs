//! Mock backend for testing
//!
//! Returns a configured candidate list (or a configured failure) and records
//! the requests it receives. Useful for unit tests and development without
//! a Gemini API key.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::{ExtractionRequest, SpendingCandidate};
use super::InvoiceExtractor;

/// Mock extractor for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    candidates: Vec<SpendingCandidate>,
    failure: Option<String>,
    /// Whether health_check should return true
    pub healthy: bool,
    requests: Arc<Mutex<Vec<ExtractionRequest>>>,
}

impl MockBackend {
    /// Create a mock that extracts nothing (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    /// Create a mock that returns these candidates on every call
    pub fn with_candidates(candidates: Vec<SpendingCandidate>) -> Self {
        Self {
            candidates,
            ..Self::new()
        }
    }

    /// Create a mock whose extraction always fails
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Default::default()
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InvoiceExtractor for MockBackend {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<SpendingCandidate>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match &self.failure {
            Some(message) => Err(Error::Extraction(message.clone())),
            None => Ok(self.candidates.clone()),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_candidates_and_records() {
        let mock = MockBackend::with_candidates(vec![SpendingCandidate::new(
            "Coffee",
            Some("Food & Dining"),
            "2025-01-05",
            4.5,
        )]);
        let request = ExtractionRequest::new(b"%PDF".to_vec(), "application/pdf", vec![]);

        let candidates = mock.extract(&request).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(mock.requests().len(), 1);
        assert_eq!(mock.requests()[0].file_bytes, b"%PDF".to_vec());
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockBackend::failing("boom");
        let request = ExtractionRequest::new(vec![1], "application/pdf", vec![]);
        assert!(matches!(
            mock.extract(&request).await,
            Err(Error::Extraction(msg)) if msg == "boom"
        ));
    }

    #[tokio::test]
    async fn test_mock_health() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
