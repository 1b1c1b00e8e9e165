//! HTTP routes for the sample service.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::debug;

use super::schemas::parse_request;
use super::GenerateService;
use crate::metrics;

/// Name reported by `GET /health`.
pub const SERVICE_NAME: &str = "sample-generator";

/// `GET /health`, `POST /generate`, `GET /metrics`; everything else is 404.
pub fn router(service: Arc<GenerateService>) -> Router {
    Router::new()
        .route("/health", get(health).fallback(not_found))
        .route("/generate", post(generate).fallback(not_found))
        .route("/metrics", get(metrics::metrics_handler).fallback(not_found))
        .fallback(not_found)
        .with_state(service)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": SERVICE_NAME }))
}

async fn generate(State(service): State<Arc<GenerateService>>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected generate request");
            metrics::record_generate("invalid");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "ok": false, "reason": e.to_string() })),
            )
                .into_response();
        }
    };

    let response = service.generate(request).await;
    metrics::record_generate(if response.ok { "ok" } else { "failed" });
    Json(response).into_response()
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "ok": false, "reason": "not found" })),
    )
        .into_response()
}
