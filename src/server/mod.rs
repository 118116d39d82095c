//! HTTP API for running detections.
//!
//! Accepts one URL or a batch as JSON and answers with serialized
//! [`DetectionResult`](crate::models::DetectionResult)s. Malformed input is a
//! 400 with a usage hint and never reaches the pipeline.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::pipeline::Detector;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<Detector>,
    pub max_batch: usize,
    pub batch_concurrency: usize,
}

impl AppState {
    pub fn new(detector: Detector) -> Self {
        let max_batch = detector.settings().server.max_batch;
        let batch_concurrency = detector.settings().server.batch_concurrency;
        Self {
            detector: Arc::new(detector),
            max_batch,
            batch_concurrency,
        }
    }
}

/// Start the web server.
pub async fn serve(detector: Detector, bind: &str) -> anyhow::Result<()> {
    let state = AppState::new(detector);
    let app = create_router(state);

    let addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
