//! HTTP server setup

use crate::api::sse;
use crate::api::sse::SsePublisher;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Build the router: health probe plus the SSE snapshot stream.
pub fn create_router(publisher: Arc<SsePublisher>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state/events", get(sse::event_stream))
        .with_state(publisher)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
