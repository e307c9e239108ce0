//! Error handling for IS23 ImouRelay

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Relay credential missing or unusable
    #[error("Config error: {0}")]
    Config(String),

    /// Caller omitted a required field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Outbound call failed at the network/HTTP layer
    #[error("Transport error: {message}")]
    Transport {
        /// Upstream HTTP status, when the exchange got that far
        status: Option<u16>,
        message: String,
    },

    /// Vendor answered at transport level but reported failure
    #[error("Vendor error {code}: {message}")]
    Vendor { code: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message, vendor_code) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            Error::Transport {
                status: upstream,
                message,
            } => (
                StatusCode::BAD_GATEWAY,
                match upstream {
                    Some(code) => format!("{} (upstream status {})", message, code),
                    None => message.clone(),
                },
                None,
            ),
            Error::Vendor { code, message } => {
                (StatusCode::BAD_REQUEST, message.clone(), Some(code.clone()))
            }
            Error::Serialization(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None),
        };

        tracing::error!(
            status = %status,
            message = %message,
            "Request error"
        );

        // One failure shape for every origin; the vendor code rides along
        // only when the vendor itself rejected the call.
        let mut body = json!({
            "success": false,
            "error": message,
        });
        if let Some(code) = vendor_code {
            body["code"] = json!(code);
        }

        (status, Json(body)).into_response()
    }
}
