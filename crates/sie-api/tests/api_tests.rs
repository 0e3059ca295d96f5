//! API Integration Tests
//!
//! Every test runs against an in-memory store and a canned community
//! source, so no network or database is needed.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sie_api::create_router_for_testing;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and decode the JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (status, json)
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let (status, json) = send(&app, create_json_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store"], "memory");
    assert!(json["uptime_seconds"].is_number());
}

#[tokio::test]
async fn test_request_counter() {
    let app = create_router_for_testing();

    send(&app, create_json_request("GET", "/api/v1/entities", None)).await;
    send(&app, create_json_request("GET", "/api/v1/relationships", None)).await;

    let (_, json) = send(&app, create_json_request("GET", "/health", None)).await;
    assert_eq!(json["total_requests"], 2);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api-docs/openapi.json", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v1/entities/resolve"].is_object());
    assert!(json["paths"]["/api/v1/discovery/communities"].is_object());
}

// =============================================================================
// Entity API Tests
// =============================================================================

#[tokio::test]
async fn test_resolve_entities() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/entities/resolve",
            Some(json!({ "text": "Sam Altman replied to @openai about Openai" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let resolved = json.as_array().unwrap();
    assert!(resolved
        .iter()
        .any(|e| e["canonical_name"] == "Sam Altman"));
    assert!(resolved.iter().all(|e| e["id"].is_number()));

    let (status, json) = send(&app, create_json_request("GET", "/api/v1/entities", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), resolved.len());
}

#[tokio::test]
async fn test_resolve_empty_text() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request("POST", "/api/v1/entities/resolve", Some(json!({ "text": "  " }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let app = create_router_for_testing();
    let body = json!({ "text": "Sam Altman replied to @openai about Openai" });

    let (_, first) = send(
        &app,
        create_json_request("POST", "/api/v1/entities/resolve", Some(body.clone())),
    )
    .await;
    let (_, second) = send(
        &app,
        create_json_request("POST", "/api/v1/entities/resolve", Some(body)),
    )
    .await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_list_entities_filters() {
    let app = create_router_for_testing();

    send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/entities/resolve",
            Some(json!({ "text": "Sam Altman replied to @openai about Openai" })),
        ),
    )
    .await;

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/entities?entity_type=robot", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/entities?skip=0&limit=5000", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!json.as_array().unwrap().is_empty());

    let (_, json) = send(
        &app,
        create_json_request("GET", "/api/v1/entities?skip=100", None),
    )
    .await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_entities() {
    let app = create_router_for_testing();

    send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/entities/resolve",
            Some(json!({ "text": "Sam Altman replied to @openai about Openai" })),
        ),
    )
    .await;

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/entities/search?query=ALTMAN", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let found = json.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["canonical_name"], "Sam Altman");

    let (status, _) = send(
        &app,
        create_json_request("GET", "/api/v1/entities/search", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_entity_and_mentions() {
    let app = create_router_for_testing();

    let (_, resolved) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/entities/resolve",
            Some(json!({ "text": "Sam Altman replied to @openai about Openai" })),
        ),
    )
    .await;
    let sam = resolved
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["canonical_name"] == "Sam Altman")
        .unwrap();
    let id = sam["id"].as_i64().unwrap();

    let (status, json) = send(
        &app,
        create_json_request("GET", &format!("/api/v1/entities/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["canonical_name"], "Sam Altman");
    assert!(json["created_at"].is_string());

    let (status, json) = send(
        &app,
        create_json_request("GET", &format!("/api/v1/entities/{id}/mentions"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let mentions = json.as_array().unwrap();
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0]["mention_text"], "Sam Altman");
}

#[tokio::test]
async fn test_get_entity_not_found() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/entities/999", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");

    // Reads other than get-by-id report absence as an empty list
    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/entities/999/mentions", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}

// =============================================================================
// Relationship API Tests
// =============================================================================

#[tokio::test]
async fn test_extract_relationships() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/relationships/extract",
            Some(json!({ "text": "Sam Altman is the CEO of OpenAI." })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ceo = json
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["subject"] == "Sam Altman" && r["object"] == "OpenAI")
        .cloned()
        .unwrap();
    assert_eq!(ceo["relationship"], "ceo");
    assert_eq!(ceo["confidence"], 0.75);

    let subject_id = ceo["subject_entity_id"].as_i64().unwrap();
    let (status, json) = send(
        &app,
        create_json_request(
            "GET",
            &format!("/api/v1/entities/{subject_id}/relationships"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["relationship_type"] == "ceo"));

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/relationships?limit=10", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_extract_empty_text() {
    let app = create_router_for_testing();

    let (status, _) = send(
        &app,
        create_json_request("POST", "/api/v1/relationships/extract", Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Discovery API Tests
// =============================================================================

#[tokio::test]
async fn test_discover_communities() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/discovery/communities",
            Some(json!({ "company_domain": "https://www.Acme.com" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ranked = json.as_array().unwrap();
    assert_eq!(ranked.len(), 2);

    assert_eq!(ranked[0]["name"], "acme");
    assert_eq!(ranked[0]["relevance_score"], 1.0);
    assert_eq!(ranked[0]["mention_count"], 3);
    assert_eq!(ranked[0]["sample_posts"].as_array().unwrap().len(), 3);

    // Post fetch failure degrades to an empty post list
    assert_eq!(ranked[1]["name"], "gardening");
    assert_eq!(ranked[1]["engagement_score"], 0.0);
    assert!(ranked[1]["sample_posts"].as_array().unwrap().is_empty());
    let value = ranked[1]["business_value_score"].as_f64().unwrap();
    assert!((value - 0.075).abs() < 1e-9);
}

#[tokio::test]
async fn test_discover_empty_domain() {
    let app = create_router_for_testing();

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/discovery/communities",
            Some(json!({ "company_domain": "" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/discovery/communities",
            Some(json!({ "company_domain": "https://" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_discover_search_failure() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/discovery/communities",
            Some(json!({ "company_domain": "unreachable.com" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "UPSTREAM_ERROR");
}
