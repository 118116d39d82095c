//! Shared fixtures for integration tests.
//!
//! A local axum server plays both the aggregator pages and the redirecting
//! link shorteners. The target platform is `target.example`, which is never
//! contacted: evidence is recognized from URLs alone.

#![allow(dead_code)]

use std::time::Duration;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use linkprobe::config::Settings;
use linkprobe::pipeline::Detector;

pub const TARGET_DOMAIN: &str = "target.example";

fn redirect(status: StatusCode, location: &str) -> Response {
    (status, [(header::LOCATION, location.to_string())]).into_response()
}

fn page(body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>My links</title></head><body>{}</body></html>",
        body
    ))
}

async fn picky(headers: HeaderMap) -> Response {
    let ua = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if ua.contains("Mozilla") {
        page(r#"<a class="card" href="https://target.example/dana">Dana</a>"#).into_response()
    } else {
        (StatusCode::FORBIDDEN, "forbidden").into_response()
    }
}

async fn head_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

fn router() -> Router {
    Router::new()
        // Redirect chains
        .route("/r/1", get(|| async { redirect(StatusCode::MOVED_PERMANENTLY, "/r/2") }))
        .route("/r/2", get(|| async { redirect(StatusCode::FOUND, "/r/3") }))
        .route("/r/3", get(|| async { redirect(StatusCode::TEMPORARY_REDIRECT, "/final") }))
        .route("/final", get(|| async { page("<p>the end</p>") }))
        .route("/rel/start", get(|| async { redirect(StatusCode::SEE_OTHER, "next") }))
        .route("/rel/next", get(|| async { page("<p>relative</p>") }))
        .route("/noloc", get(|| async { StatusCode::FOUND }))
        .route("/loop", get(|| async { redirect(StatusCode::FOUND, "/loop") }))
        .route(
            "/headless",
            get(|| async { redirect(StatusCode::FOUND, "/final") }).head(head_not_allowed),
        )
        .route(
            "/go/profile",
            get(|| async { redirect(StatusCode::FOUND, "https://target.example/bob") }),
        )
        .route("/go/nowhere", get(|| async { redirect(StatusCode::FOUND, "/final") }))
        .route("/r/slow", get(|| async { redirect(StatusCode::FOUND, "/r/stall") }))
        .route(
            "/r/stall",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                redirect(StatusCode::FOUND, "/final")
            }),
        )
        // Aggregator pages
        .route(
            "/bio/direct",
            get(|| async {
                page(
                    r#"<h1>Alice</h1>
                    <a href="https://target.example/alice">My page</a>
                    <img src="https://target.example/files/x.jpg">"#,
                )
            }),
        )
        .route("/bio/picky", get(picky))
        .route(
            "/bio/redirecting",
            get(|| async {
                page(
                    r#"<h1>Bob</h1>
                    <a href="/go/nowhere">Music</a>
                    <a href="/go/profile">Exclusive</a>
                    <a href="mailto:bob@mail.example">Mail</a>"#,
                )
            }),
        )
        .route(
            "/bio/empty",
            get(|| async {
                page(
                    r#"<h1>Carol</h1>
                    <p>Photographer and hiker.</p>
                    <a href="/final">Portfolio</a>"#,
                )
            }),
        )
        .route(
            "/bio/brand",
            get(|| async {
                page("<h1>Erin</h1><p>Catch my spicy stuff on Target, link in my DMs.</p>")
            }),
        )
        .route(
            "/bio/agegate",
            get(|| async {
                page(
                    "<h1>Fay</h1><div class=\"gate\">Age verification required. \
                     This page contains adult content. Click to enter.</div>",
                )
            }),
        )
        .route(
            "/hidden/links",
            get(|| async {
                page(r#"<ul><li><a href="https://target.example/gina">Gina</a></li></ul>"#)
            }),
        )
        .route(
            "/bio/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                page("<p>late</p>")
            }),
        )
}

/// Serve the fixtures on an ephemeral port and return the base URL.
pub async fn spawn_fixture_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Settings aimed at `target.example` with small budgets and no rendering
/// engine.
pub fn test_settings() -> Settings {
    let mut settings = Settings::for_domain(TARGET_DOMAIN).unwrap();
    settings.http.system_proxy = false;
    settings.http.request_timeout = Duration::from_secs(5);
    settings.browser.enabled = false;
    settings.pipeline.global_budget = Duration::from_secs(60);
    settings.pipeline.max_settle = Duration::ZERO;
    settings.pipeline.direct_sample.hop_timeout = Duration::from_secs(2);
    settings.pipeline.rotation_sample.hop_timeout = Duration::from_secs(2);
    settings
}

pub fn test_detector(settings: Settings) -> Detector {
    Detector::new(settings).unwrap().with_browser(None)
}
