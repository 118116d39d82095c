//! Router configuration for the web server.

use axum::{routing::get, routing::post, Router};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/detect",
            get(handlers::detect_query).post(handlers::detect_body),
        )
        .route("/batch", post(handlers::batch))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
