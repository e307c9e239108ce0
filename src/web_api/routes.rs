//! Relay route handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::error::Error;
use crate::imou_client::{
    DeviceInventory, DeviceListRequest, StreamFetchRequest, StreamGrant, TokenGrant,
};
use crate::state::AppState;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::device_status))
        .route("/api/imou/token", post(acquire_token))
        .route("/api/imou/stream", post(fetch_stream))
        .route("/api/imou/devices", post(list_devices))
        .fallback(endpoint_not_found)
        .with_state(state)
}

/// POST /api/imou/token - acquire a vendor access token
async fn acquire_token(State(state): State<AppState>) -> Result<Json<TokenGrant>, Error> {
    let grant = state.imou.acquire_token().await?;
    Ok(Json(grant))
}

/// POST /api/imou/stream - fetch the HLS stream URL for a device
async fn fetch_stream(
    State(state): State<AppState>,
    request: Option<Json<StreamFetchRequest>>,
) -> Result<Json<StreamGrant>, Error> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let grant = state.imou.fetch_stream(request).await?;
    Ok(Json(grant))
}

/// POST /api/imou/devices - list the devices for the account
async fn list_devices(
    State(state): State<AppState>,
    request: Option<Json<DeviceListRequest>>,
) -> Result<Json<DeviceInventory>, Error> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let inventory = state.imou.list_devices(request).await?;
    Ok(Json(inventory))
}

/// Fallback for unknown paths
async fn endpoint_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "availableEndpoints": [
                "GET /healthz",
                "GET /api/status",
                "POST /api/imou/token",
                "POST /api/imou/stream",
                "POST /api/imou/devices",
            ]
        })),
    )
}
