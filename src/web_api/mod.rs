//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request extraction
//! - Response formatting

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        credential_loaded: state.imou.has_credential(),
    };

    Json(response)
}

/// Status endpoint (araneaDevices common)
pub async fn device_status(State(_state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "device_type": "ar-is23",
        "firmware_version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
