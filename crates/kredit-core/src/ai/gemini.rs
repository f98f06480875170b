//! Gemini backend implementation
//!
//! Sends the invoice file inline (base64) together with the rendered prompt to
//! the `generateContent` endpoint and parses the JSON array the model returns.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::parsing::parse_candidates;
use super::prompt::render_extraction_prompt;
use super::types::{ExtractionRequest, SpendingCandidate};
use super::InvoiceExtractor;

/// Public Gemini API base URL
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model when `GEMINI_MODEL` is unset
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

/// Default request timeout when `EXTRACTION_TIMEOUT_SECS` is unset
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Header carrying the API key; keeps the key out of URLs and error text
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini extractor
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    /// Create from environment variables
    ///
    /// Returns None when `GEMINI_API_KEY` is unset (extraction not configured).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let base_url =
            std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| GEMINI_API_BASE.to_string());
        let timeout_secs = std::env::var("EXTRACTION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        match Self::new(&base_url, &api_key, &model, Duration::from_secs(timeout_secs)) {
            Ok(backend) => Some(backend),
            Err(e) => {
                warn!(error = %e, "Failed to build Gemini HTTP client");
                None
            }
        }
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}:{}", self.model_url(), method)
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Extraction(format!(
                "Gemini request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            Error::Extraction(format!("Gemini request failed: {}", e.without_url()))
        }
    }
}

/// Request to the generateContent endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Response from the generateContent endpoint
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl InvoiceExtractor for GeminiBackend {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Vec<SpendingCandidate>> {
        let prompt = render_extraction_prompt(request);
        let data = base64::engine::general_purpose::STANDARD.encode(&request.file_bytes);

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type.clone(),
                            data,
                        },
                    },
                ],
            }],
        };

        debug!(
            model = %self.model,
            bytes = request.file_bytes.len(),
            categories = request.allowed_categories.len(),
            "Sending invoice to Gemini"
        );

        let response = self
            .http_client
            .post(self.api_url("generateContent"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to parse Gemini response: {}", e)))?;

        let text = api_response.text();
        if text.trim().is_empty() {
            return Err(Error::Extraction("empty response".into()));
        }
        debug!("Gemini extraction response: {}", text);

        parse_candidates(&text)
    }

    async fn health_check(&self) -> bool {
        let request = self
            .http_client
            .get(self.model_url())
            .header(API_KEY_HEADER, &self.api_key);
        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
