mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use linkprobe::server::{create_router, AppState};

use common::{spawn_fixture_server, test_detector, test_settings};

fn app() -> axum::Router {
    create_router(AppState::new(test_detector(test_settings())))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["target_domain"], "target.example");
    assert!(json["endpoints"]["POST /batch"].is_string());
    assert_eq!(json["rendering_engine"], false);
}

#[tokio::test]
async fn test_post_detect_matches() {
    let base = spawn_fixture_server().await;
    let url = format!("{}/bio/direct", base);

    let response = app()
        .oneshot(post_json("/detect", serde_json::json!({ "url": url })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["request"]["url"], url.as_str());
    assert_eq!(json["matched"], true);
    assert_eq!(json["method"], "phase1_direct_scan");
    assert_eq!(json["confidence"], "high");
    assert_eq!(json["evidence_urls"][0], "https://target.example/alice");
}

#[tokio::test]
async fn test_get_detect_with_query() {
    let base = spawn_fixture_server().await;
    let uri = format!("/detect?url={}/bio/redirecting", base);

    let response = app()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["matched"], true);
    assert_eq!(json["method"], "phase1_direct_scan:redirect");
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let base = spawn_fixture_server().await;
    let urls = vec![
        format!("{}/bio/redirecting", base),
        "http://127.0.0.1:1/down".to_string(),
        format!("{}/bio/direct", base),
    ];

    let response = app()
        .oneshot(post_json("/batch", serde_json::json!({ "urls": urls })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["count"], 3);
    assert_eq!(json["matched"], 2);
    assert_eq!(json["request"]["urls"][1], "http://127.0.0.1:1/down");

    let results = json["results"].as_array().unwrap();
    assert_eq!(results[0]["evidence_urls"][0], "https://target.example/bob");
    assert_eq!(results[1]["matched"], false);
    assert!(!results[1]["errors"].as_array().unwrap().is_empty());
    assert_eq!(results[2]["evidence_urls"][0], "https://target.example/alice");
}

#[tokio::test]
async fn test_empty_batch_is_client_error() {
    let response = app()
        .oneshot(post_json("/batch", serde_json::json!({ "urls": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["usage"].is_string());
}
