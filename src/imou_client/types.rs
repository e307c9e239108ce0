//! Imou OpenAPI Types
//!
//! Wire types for the Imou OpenAPI relay. Vendor-facing field names follow
//! the vendor contract (`appId`, `accessToken`, `deviceId`, ...); the
//! caller-facing responses keep the flat success shape the frontend
//! already consumes.

use serde::{Deserialize, Serialize};

// ========================================
// System Envelope
// ========================================

/// Authentication/metadata block sent with every vendor call
///
/// `sign` is attached last, computed over all other fields present.
#[derive(Debug, Clone, Serialize)]
pub struct SystemEnvelope {
    pub ver: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    /// Milliseconds since epoch
    pub time: i64,
    pub nonce: String,
    /// Present on authenticated operations only
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub sign: String,
}

/// Per-request freshness pair stamped into the envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeStamp {
    /// Milliseconds since epoch
    pub time: i64,
    /// Short alphanumeric nonce
    pub nonce: String,
}

// ========================================
// Operations
// ========================================

/// Vendor operation relayed by this service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    TokenAcquire,
    StreamFetch,
    DeviceList,
}

impl Operation {
    /// Endpoint path under the configured API base
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Operation::TokenAcquire => ACCESS_TOKEN_PATH,
            Operation::StreamFetch => LIVE_STREAM_PATH,
            Operation::DeviceList => DEVICE_LIST_PATH,
        }
    }

    /// Whether the envelope must carry a caller-supplied access token
    pub fn requires_access_token(&self) -> bool {
        !matches!(self, Operation::TokenAcquire)
    }

    /// Failure message used when the vendor omits `msg`
    pub fn fallback_error(&self) -> &'static str {
        match self {
            Operation::TokenAcquire => "Failed to get access token",
            Operation::StreamFetch => "Failed to get stream URL",
            Operation::DeviceList => "Failed to get devices",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::TokenAcquire => "token_acquire",
            Operation::StreamFetch => "stream_fetch",
            Operation::DeviceList => "device_list",
        };
        write!(f, "{}", name)
    }
}

// ========================================
// Outbound Request Body
// ========================================

/// Body shape for every vendor call: `{ system, params? }`
#[derive(Debug, Clone, Serialize)]
pub struct VendorRequest {
    pub system: SystemEnvelope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Params block for the live stream operation
#[derive(Debug, Clone, Serialize)]
pub struct StreamParams {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "streamId")]
    pub stream_id: i32,
    pub protocol: String,
}

impl StreamParams {
    /// Main HLS stream for a device (streamId 0, protocol "hls")
    pub fn hls_main(device_id: String) -> Self {
        Self {
            device_id,
            stream_id: DEFAULT_STREAM_ID,
            protocol: STREAM_PROTOCOL.to_string(),
        }
    }
}

// ========================================
// Vendor Response
// ========================================

/// Raw vendor response envelope
///
/// Success means `code == "200"` AND `result` present; everything else is
/// a vendor-reported failure.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorResponse {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl VendorResponse {
    /// Extract the success `result`, or the vendor failure as a crate error
    pub fn into_result(self, fallback_error: &str) -> crate::Result<serde_json::Value> {
        if self.code == VENDOR_OK_CODE {
            if let Some(result) = self.result {
                return Ok(result);
            }
        }

        Err(crate::Error::Vendor {
            code: self.code,
            message: self.msg.unwrap_or_else(|| fallback_error.to_string()),
        })
    }
}

// ========================================
// Caller-Facing Requests
// ========================================

/// Request body for POST /api/imou/stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamFetchRequest {
    #[serde(default, rename = "deviceId")]
    pub device_id: Option<String>,
    /// `token` is the field name the original frontend sends
    #[serde(default, rename = "accessToken", alias = "token")]
    pub access_token: Option<String>,
}

/// Request body for POST /api/imou/devices
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceListRequest {
    /// `token` is the field name the original frontend sends
    #[serde(default, rename = "accessToken", alias = "token")]
    pub access_token: Option<String>,
}

/// Extract a required request field; absent or empty counts as missing
pub(crate) fn require_field<'a>(value: &'a Option<String>, name: &str) -> crate::Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(crate::Error::Validation(format!("{} is required", name))),
    }
}

// ========================================
// Caller-Facing Responses
// ========================================

/// Success payload for the token operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub success: bool,
    pub token: String,
    #[serde(rename = "expireTime")]
    pub expire_time: i64,
}

/// Token fields inside the vendor `result`
#[derive(Debug, Clone, Deserialize)]
struct TokenResult {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "expireTime")]
    expire_time: i64,
}

impl TokenGrant {
    /// Map a token-operation vendor `result` into the caller payload
    pub fn from_result(result: serde_json::Value) -> crate::Result<Self> {
        let parsed: TokenResult = serde_json::from_value(result)
            .map_err(|e| crate::Error::Internal(format!("Unexpected token result shape: {}", e)))?;

        Ok(Self {
            success: true,
            token: parsed.access_token,
            expire_time: parsed.expire_time,
        })
    }
}

/// Success payload for the stream operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamGrant {
    pub success: bool,
    #[serde(
        default,
        rename = "streamUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub stream_url: Option<String>,
    /// Full vendor result, passed through unmodified
    #[serde(rename = "streamInfo")]
    pub stream_info: serde_json::Value,
}

impl StreamGrant {
    /// Map a stream-operation vendor `result` into the caller payload.
    ///
    /// Prefers the nested `liveStreamInfo.url`; falls back to a top-level
    /// `url` when the nested field is absent.
    pub fn from_result(result: serde_json::Value) -> Self {
        let stream_url = result
            .get("liveStreamInfo")
            .and_then(|info| info.get("url"))
            .and_then(|url| url.as_str())
            .or_else(|| result.get("url").and_then(|url| url.as_str()))
            .map(|url| url.to_string());

        Self {
            success: true,
            stream_url,
            stream_info: result,
        }
    }
}

/// Success payload for the device list operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInventory {
    pub success: bool,
    pub devices: Vec<serde_json::Value>,
}

impl DeviceInventory {
    /// Map a device-list vendor `result`; a missing `devices` array is an
    /// empty inventory, never an error
    pub fn from_result(result: serde_json::Value) -> Self {
        let devices = match result.get("devices").cloned() {
            Some(serde_json::Value::Array(devices)) => devices,
            _ => Vec::new(),
        };

        Self {
            success: true,
            devices,
        }
    }
}

// ========================================
// Constants
// ========================================

/// Envelope protocol version
pub const PROTOCOL_VERSION: &str = "1.0";

/// Vendor success code
pub const VENDOR_OK_CODE: &str = "200";

/// Default Imou OpenAPI base URL
pub const DEFAULT_API_BASE: &str = "https://openapi.imou.com";

/// Token acquisition endpoint path
pub const ACCESS_TOKEN_PATH: &str = "/openapi/accessToken";

/// Live stream endpoint path
pub const LIVE_STREAM_PATH: &str = "/openapi/getLiveStreamApi";

/// Device list endpoint path
pub const DEVICE_LIST_PATH: &str = "/openapi/deviceList";

/// Fixed stream id for the main stream
pub const DEFAULT_STREAM_ID: i32 = 0;

/// Fixed streaming protocol requested from the vendor
pub const STREAM_PROTOCOL: &str = "hls";

/// Nonce length stamped into each envelope
pub const NONCE_LEN: usize = 8;

/// Client identifier sent on every vendor call
pub const CLIENT_USER_AGENT: &str = concat!("IS23ImouRelay/", env!("CARGO_PKG_VERSION"));
