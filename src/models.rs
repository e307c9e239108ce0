//! Shared API models

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    /// Whether IMOU_APP_ID / IMOU_APP_SECRET were present at boot
    pub credential_loaded: bool,
}
