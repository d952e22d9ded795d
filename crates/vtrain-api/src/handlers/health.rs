//! Health check handlers.

use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Root liveness check, kept byte-compatible with existing clients.
pub async fn root() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
