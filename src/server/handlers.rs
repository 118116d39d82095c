//! HTTP request handlers for the web server.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::models::{DetectionResult, ProbeTarget};

const DETECT_USAGE: &str =
    r#"GET /detect?url=https://linktr.ee/name or POST /detect with {"url": "https://linktr.ee/name"}"#;
const BATCH_USAGE: &str =
    r#"POST /batch with {"urls": ["https://linktr.ee/a", "https://beacons.ai/b"]}"#;

/// Query parameters for `GET /detect`.
#[derive(Debug, Deserialize)]
pub struct DetectQuery {
    pub url: Option<String>,
}

/// Body of `POST /detect`. `bio_link` is accepted as an alias of `url`.
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub url: Option<String>,
    pub bio_link: Option<String>,
}

/// Body of `POST /batch`. `bio_links` is accepted as an alias of `urls`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub urls: Option<Vec<String>>,
    pub bio_links: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct EchoedUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct EchoedUrls {
    urls: Vec<String>,
}

/// A detection result with the request that produced it.
#[derive(Debug, Serialize)]
struct DetectResponse {
    request: EchoedUrl,
    #[serde(flatten)]
    result: DetectionResult,
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    request: EchoedUrls,
    count: usize,
    matched: usize,
    results: Vec<DetectionResult>,
}

fn bad_request(error: impl Into<String>, usage: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": error.into(), "usage": usage })),
    )
        .into_response()
}

/// Endpoint listing and usage.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let settings = state.detector.settings();
    Json(serde_json::json!({
        "service": "linkprobe",
        "version": env!("CARGO_PKG_VERSION"),
        "target_domain": settings.signature.domain(),
        "endpoints": {
            "GET /health": "liveness check",
            "GET /detect?url=<url>": "probe one bio link page",
            "POST /detect": "probe one bio link page, body {\"url\": \"...\"}",
            "POST /batch": format!("probe up to {} pages, body {{\"urls\": [...]}}", state.max_batch),
        },
        "usage": [DETECT_USAGE, BATCH_USAGE],
        "rendering_engine": state.detector.has_browser(),
    }))
}

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /detect?url=...`
pub async fn detect_query(
    State(state): State<AppState>,
    Query(params): Query<DetectQuery>,
) -> Response {
    match params.url {
        Some(url) => run_detect(&state, url).await,
        None => bad_request("missing 'url' query parameter", DETECT_USAGE),
    }
}

/// `POST /detect` with a JSON body.
pub async fn detect_body(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return bad_request(rejection.body_text(), DETECT_USAGE),
    };
    match body.url.or(body.bio_link) {
        Some(url) => run_detect(&state, url).await,
        None => bad_request("missing 'url' field", DETECT_USAGE),
    }
}

async fn run_detect(state: &AppState, url: String) -> Response {
    let target = match ProbeTarget::parse(&url) {
        Ok(target) => target,
        Err(e) => return bad_request(e.to_string(), DETECT_USAGE),
    };

    info!(target = %target, "API detect request");
    let result = state.detector.detect_target(&target).await;
    Json(DetectResponse {
        request: EchoedUrl { url },
        result,
    })
    .into_response()
}

/// `POST /batch` with a JSON body.
///
/// Entries that are not valid URLs come back as unmatched results carrying
/// the parse error, so the output always lines up with the input.
pub async fn batch(
    State(state): State<AppState>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return bad_request(rejection.body_text(), BATCH_USAGE),
    };
    let Some(urls) = body.urls.or(body.bio_links) else {
        return bad_request("missing 'urls' field", BATCH_USAGE);
    };
    if urls.is_empty() {
        return bad_request("'urls' must not be empty", BATCH_USAGE);
    }

    info!(count = urls.len(), "API batch request");
    match state
        .detector
        .detect_batch(&urls, state.batch_concurrency)
        .await
    {
        Ok(results) => {
            let matched = results.iter().filter(|r| r.matched).count();
            Json(BatchResponse {
                count: results.len(),
                matched,
                results,
                request: EchoedUrls { urls },
            })
            .into_response()
        }
        Err(e) if e.is_client_error() => bad_request(e.to_string(), BATCH_USAGE),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
