//! Application state
//!
//! Holds the env-loaded configuration and shared service handles

use crate::imou_client::ImouClient;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Imou application credential pair
///
/// Loaded once at startup, immutable for the process lifetime. The secret
/// never appears in logs or API responses.
#[derive(Clone)]
pub struct ImouCredential {
    pub app_id: String,
    pub app_secret: String,
}

impl fmt::Debug for ImouCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImouCredential")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .finish()
    }
}

impl ImouCredential {
    /// Read the credential pair from the environment, if both halves are set
    pub fn from_env() -> Option<Self> {
        let app_id = std::env::var("IMOU_APP_ID").ok().filter(|v| !v.is_empty())?;
        let app_secret = std::env::var("IMOU_APP_SECRET")
            .ok()
            .filter(|v| !v.is_empty())?;
        Some(Self { app_id, app_secret })
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Imou OpenAPI base URL
    pub imou_api_base: String,
    /// Relay credential (IMOU_APP_ID / IMOU_APP_SECRET), if configured
    pub credential: Option<ImouCredential>,
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
    /// CORS allow-list; empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            imou_api_base: std::env::var("IMOU_API_BASE")
                .unwrap_or_else(|_| crate::imou_client::types::DEFAULT_API_BASE.to_string()),
            credential: ImouCredential::from_env(),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8090),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// ImouClient (vendor API adapter)
    pub imou: Arc<ImouClient>,
    /// Process start, for /healthz uptime
    pub started_at: Instant,
}
