//! Test utilities for kredit-core
//!
//! This module provides a mock Gemini server that speaks just enough of the
//! `generateContent` API for integration tests and local development.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::API_KEY_HEADER;

/// Response text used by `MockGeminiServer::start()`: one coffee purchase,
/// wrapped in a code fence the way models often answer
pub const DEFAULT_RESPONSE_TEXT: &str = "```json\n[{\"name\": \"Coffee\", \"category\": \"Food & Dining\", \"date\": \"2025-01-05\", \"amount\": 4.50}]\n```";

#[derive(Clone)]
struct MockState {
    /// Candidate text returned by generateContent
    text: String,
    /// When set, generateContent fails with this status
    fail_with: Option<StatusCode>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Mock Gemini server for testing and development
pub struct MockGeminiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockGeminiServer {
    /// Start the mock server with the default coffee response
    pub async fn start() -> Self {
        Self::start_with_response(DEFAULT_RESPONSE_TEXT).await
    }

    /// Start the mock server returning `text` as the model output
    pub async fn start_with_response(text: &str) -> Self {
        Self::spawn(MockState {
            text: text.to_string(),
            fail_with: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        })
        .await
    }

    /// Start a mock server whose generateContent always fails
    pub async fn start_failing(status: StatusCode) -> Self {
        Self::spawn(MockState {
            text: String::new(),
            fail_with: Some(status),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
        .await
    }

    async fn spawn(state: MockState) -> Self {
        let requests = state.requests.clone();
        let app = Router::new()
            .route("/models/:model", get(handle_model).post(handle_generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            requests,
        }
    }

    /// Get the base URL for this mock server (use as `GEMINI_API_BASE`)
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Request bodies received by generateContent
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reject requests that do not carry the API key header
fn require_api_key(headers: &HeaderMap) -> Option<Response> {
    let present = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.is_empty());
    if present {
        None
    } else {
        Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "code": 401, "message": "missing API key" } })),
            )
                .into_response(),
        )
    }
}

/// Model metadata endpoint (health check)
async fn handle_model(Path(model): Path<String>, headers: HeaderMap) -> Response {
    if let Some(rejection) = require_api_key(&headers) {
        return rejection;
    }
    Json(json!({
        "name": format!("models/{}", model),
        "displayName": model,
    }))
    .into_response()
}

/// `models/{model}:generateContent`
async fn handle_generate(
    State(state): State<MockState>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    if !model_action.ends_with(":generateContent") {
        return (StatusCode::NOT_FOUND, "unknown method").into_response();
    }
    if let Some(rejection) = require_api_key(&headers) {
        return rejection;
    }

    state.requests.lock().unwrap().push(request);

    if let Some(status) = state.fail_with {
        return (
            status,
            Json(json!({ "error": { "code": status.as_u16(), "message": "mock failure" } })),
        )
            .into_response();
    }

    Json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": state.text }]
            },
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}
