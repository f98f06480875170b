//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use kredit_core::ai::{GeminiBackend, MockBackend, SpendingCandidate};
use kredit_core::db::Database;
use kredit_core::test_utils::MockGeminiServer;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "kredit-test-boundary";

fn test_config() -> ServerConfig {
    ServerConfig {
        jwt_secret: "test-secret".to_string(),
        allowed_origins: vec![],
    }
}

/// Database with one user, "alice" / "password123"
fn setup_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.create_user("alice", "password123").unwrap();
    db
}

fn setup_test_app() -> Router {
    create_router_with_options(setup_db(), test_config(), None)
}

fn setup_app_with_mock(mock: MockBackend) -> Router {
    create_router_with_options(setup_db(), test_config(), Some(ExtractorClient::Mock(mock)))
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> axum::response::Response {
    let body = serde_json::json!({ "username": username, "password": password });
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Log in as alice and return the bearer token
async fn token(app: &Router) -> String {
    let response = login(app, "alice", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    json["token"].as_str().unwrap().to_string()
}

fn authed(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
}

fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    authed(method, uri, token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a multipart body with a single field
fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(token: &str, field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    authed("POST", "/api/invoices", token)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, filename, content)))
        .unwrap()
}

async fn category_id(app: &Router, token: &str, name: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/categories", token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    json.as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == name)
        .and_then(|c| c["id"].as_i64())
        .unwrap()
}

// ========== Health & Auth Tests ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_login_success_seeds_categories() {
    let app = setup_test_app();

    let response = login(&app, "alice", "password123").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json["token"].as_str().is_some());
    assert!(json["user_id"].as_i64().is_some());

    let token = json["token"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/categories", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 10);
    assert!(names.contains(&"Food & Dining"));
    assert!(names.contains(&"Other"));
}

#[tokio::test]
async fn test_second_login_does_not_reseed() {
    let app = setup_test_app();
    let token = token(&app).await;

    let id = category_id(&app, &token, "Travel").await;
    let response = app
        .clone()
        .oneshot(
            authed("DELETE", &format!("/api/categories/{}", id), &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let token = self::token(&app).await;
    let response = app
        .clone()
        .oneshot(authed("GET", "/api/categories", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = setup_test_app();

    let response = login(&app, "alice", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid credentials");

    let response = login(&app, "nobody", "password123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_malformed_body() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"username":"alice"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_required() {
    let app = setup_test_app();

    for (method, uri) in [
        ("GET", "/api/categories"),
        ("GET", "/api/spendings"),
        ("POST", "/api/invoices"),
        ("DELETE", "/api/categories/1"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
    }

    let response = app
        .oneshot(
            authed("GET", "/api/categories", "garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let app = setup_test_app();
    let forged = TokenService::new("not-the-server-secret")
        .issue_token(1)
        .unwrap();

    let response = app
        .oneshot(authed("GET", "/api/spendings", &forged).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ========== Category API Tests ==========

#[tokio::test]
async fn test_create_category() {
    let app = setup_test_app();
    let token = token(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            &token,
            serde_json::json!({ "name": "Pets" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Pets");
    assert!(json["id"].as_i64().is_some());

    // Duplicate
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            &token,
            serde_json::json!({ "name": "Pets" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing name
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/categories",
            &token,
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Name is required");
}

#[tokio::test]
async fn test_delete_other_forbidden() {
    let app = setup_test_app();
    let token = token(&app).await;
    let other = category_id(&app, &token, "Other").await;

    let response = app
        .oneshot(
            authed("DELETE", &format!("/api/categories/{}", other), &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_category_not_found() {
    let app = setup_test_app();
    let token = token(&app).await;

    let response = app
        .oneshot(
            authed("DELETE", "/api/categories/99999", &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_category_invalid_id() {
    let app = setup_test_app();
    let token = token(&app).await;

    let response = app
        .oneshot(
            authed("DELETE", "/api/categories/abc", &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid category id");
}

#[tokio::test]
async fn test_delete_other_with_spendings_forbidden() {
    let mock = MockBackend::with_candidates(vec![SpendingCandidate::new(
        "Stamps",
        Some("Other"),
        "2025-02-01",
        3.0,
    )]);
    let app = setup_app_with_mock(mock);
    let token = token(&app).await;

    let response = app
        .clone()
        .oneshot(upload_request(&token, "file", "misc.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let other = category_id(&app, &token, "Other").await;
    let response = app
        .clone()
        .oneshot(
            authed("DELETE", &format!("/api/categories/{}", other), &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(authed("GET", "/api/spendings", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["category_name"], "Other");
}

// ========== Invoice Upload Tests ==========

#[tokio::test]
async fn test_upload_invoice_with_mock_extractor() {
    let mock = MockBackend::with_candidates(vec![
        SpendingCandidate::new("Coffee", Some("Food & Dining"), "2025-01-05", 4.5),
        SpendingCandidate::new("Refund", Some("Shopping"), "2025-01-06", -3.0),
        SpendingCandidate::new("Gadget", Some("Gizmos"), "2025-01-07", 30.0),
    ]);
    let app = setup_app_with_mock(mock.clone());
    let token = token(&app).await;

    let response = app
        .clone()
        .oneshot(upload_request(&token, "file", "jan.pdf", b"%PDF-1.4 invoice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Invoice processed successfully");
    assert_eq!(json["spendings_count"], 2);
    assert_eq!(json["skipped_negative"], 1);
    assert_eq!(json["invoice"]["filename"], "jan.pdf");

    // The extractor saw the caller's categories
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0]
        .allowed_categories
        .contains(&"Food & Dining".to_string()));

    let response = app
        .oneshot(authed("GET", "/api/spendings", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let spendings = json.as_array().unwrap();
    assert_eq!(spendings.len(), 2);
    // Newest date first; unknown category falls back to Other
    assert_eq!(spendings[0]["name"], "Gadget");
    assert_eq!(spendings[0]["category_name"], "Other");
    assert_eq!(spendings[1]["category_name"], "Food & Dining");
}

#[tokio::test]
async fn test_upload_invoice_through_gemini_wire() {
    let server = MockGeminiServer::start().await;
    let gemini = GeminiBackend::new(&server.url(), "test-key", "gemini-test", Duration::from_secs(5))
        .unwrap();
    let app = create_router_with_options(
        setup_db(),
        test_config(),
        Some(ExtractorClient::Gemini(gemini)),
    );
    let token = token(&app).await;

    let response = app
        .clone()
        .oneshot(upload_request(&token, "file", "receipt.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["spendings_count"], 1);
    assert_eq!(server.requests().len(), 1);

    let response = app
        .oneshot(authed("GET", "/api/spendings", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["name"], "Coffee");
    assert_eq!(json[0]["category_name"], "Food & Dining");
    assert_eq!(json[0]["amount"], 4.5);
    assert_eq!(json[0]["date"], "2025-01-05");
}

#[tokio::test]
async fn test_upload_extraction_failure() {
    let app = setup_app_with_mock(MockBackend::failing("quota exceeded"));
    let token = token(&app).await;

    let response = app
        .oneshot(upload_request(&token, "file", "jan.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = get_body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Error processing invoice"));
}

#[tokio::test]
async fn test_upload_without_extractor() {
    let app = setup_test_app();
    let token = token(&app).await;

    let response = app
        .oneshot(upload_request(&token, "file", "jan.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_upload_missing_file_part() {
    let app = setup_app_with_mock(MockBackend::new());
    let token = token(&app).await;

    let response = app
        .oneshot(upload_request(&token, "attachment", "jan.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No file part");
}

#[tokio::test]
async fn test_upload_empty_filename() {
    let app = setup_app_with_mock(MockBackend::new());
    let token = token(&app).await;

    let response = app
        .oneshot(upload_request(&token, "file", "", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "No selected file");
}

#[tokio::test]
async fn test_upload_empty_file() {
    let app = setup_app_with_mock(MockBackend::new());
    let token = token(&app).await;

    let response = app
        .oneshot(upload_request(&token, "file", "empty.pdf", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Spending API Tests ==========

/// App with two spendings for alice: Coffee (Jan) and Hotel (Mar)
async fn app_with_spendings() -> (Router, String) {
    let mock = MockBackend::with_candidates(vec![
        SpendingCandidate::new("Coffee", Some("Food & Dining"), "2025-01-05", 4.5),
        SpendingCandidate::new("Hotel", Some("Travel"), "2025-03-10", 120.0),
    ]);
    let app = setup_app_with_mock(mock);
    let token = token(&app).await;

    let response = app
        .clone()
        .oneshot(upload_request(&token, "file", "mixed.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    (app, token)
}

#[tokio::test]
async fn test_list_spendings_month_filter() {
    let (app, token) = app_with_spendings().await;

    let response = app
        .clone()
        .oneshot(
            authed("GET", "/api/spendings?month=2025-03", &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let spendings = json.as_array().unwrap();
    assert_eq!(spendings.len(), 1);
    assert_eq!(spendings[0]["name"], "Hotel");

    let response = app
        .clone()
        .oneshot(
            authed("GET", "/api/spendings?month=2025-02", &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());

    let response = app
        .oneshot(
            authed("GET", "/api/spendings?month=march", &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_spending_category() {
    let (app, token) = app_with_spendings().await;

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/spendings", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let hotel_id = json[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/spendings/{}", hotel_id),
            &token,
            serde_json::json!({ "category_name": "Entertainment" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["category_name"], "Entertainment");

    // Unknown category
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/spendings/{}", hotel_id),
            &token,
            serde_json::json!({ "category_name": "Nope" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unknown spending
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/spendings/does-not-exist",
            &token,
            serde_json::json!({ "category_name": "Travel" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Missing field
    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/api/spendings/{}", hotel_id),
            &token,
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_update_spendings() {
    let (app, token) = app_with_spendings().await;

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/spendings", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let mut ids: Vec<String> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    ids.push("missing-id".to_string());

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/api/spendings",
            &token,
            serde_json::json!({ "spending_ids": ids, "category_name": "Shopping" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["updated_count"], 2);

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/spendings", &token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["category_name"] == "Shopping"));

    // Empty id list
    let response = app
        .oneshot(json_request(
            "PATCH",
            "/api/spendings",
            &token,
            serde_json::json!({ "spending_ids": [], "category_name": "Shopping" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_category_moves_spendings() {
    let (app, token) = app_with_spendings().await;
    let travel = category_id(&app, &token, "Travel").await;

    let response = app
        .clone()
        .oneshot(
            authed("DELETE", &format!("/api/categories/{}", travel), &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Category deleted successfully");
    assert_eq!(json["spendings_moved"], 1);

    let response = app
        .oneshot(
            authed("GET", "/api/spendings?month=2025-03", &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["category_name"], "Other");
}

#[tokio::test]
async fn test_users_are_isolated() {
    let db = setup_db();
    db.create_user("bob", "hunter22").unwrap();
    let mock = MockBackend::with_candidates(vec![SpendingCandidate::new(
        "Coffee",
        Some("Food & Dining"),
        "2025-01-05",
        4.5,
    )]);
    let app = create_router_with_options(db, test_config(), Some(ExtractorClient::Mock(mock)));

    let alice = token(&app).await;
    let response = app
        .clone()
        .oneshot(upload_request(&alice, "file", "jan.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = login(&app, "bob", "hunter22").await;
    let bob = get_body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(authed("GET", "/api/spendings", &bob).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}
