//! ImouClient - Imou OpenAPI Relay Adapter
//!
//! ## Responsibilities
//!
//! - Build and sign the system envelope for each vendor call
//! - Relay the token / stream / device-list operations
//! - Normalize vendor responses into the caller-facing shape
//!
//! The frontend never sees the app secret; every envelope is assembled and
//! signed inside this module.

mod sign;
pub mod types;

pub use types::{
    DeviceInventory, DeviceListRequest, EnvelopeStamp, Operation, StreamFetchRequest, StreamGrant,
    SystemEnvelope, TokenGrant,
};

use crate::error::{Error, Result};
use crate::state::ImouCredential;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use std::time::Duration;
use types::{StreamParams, VendorRequest, VendorResponse};

/// Source of per-request envelope freshness
///
/// Injected so envelope construction can be driven deterministically in
/// tests; production uses [`SystemStampSource`].
pub trait StampSource: Send + Sync {
    /// Fresh timestamp/nonce pair for one envelope
    fn stamp(&self) -> EnvelopeStamp;
}

/// System clock plus a random alphanumeric nonce
pub struct SystemStampSource;

impl StampSource for SystemStampSource {
    fn stamp(&self) -> EnvelopeStamp {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(types::NONCE_LEN)
            .map(char::from)
            .collect();

        EnvelopeStamp {
            time: chrono::Utc::now().timestamp_millis(),
            nonce,
        }
    }
}

/// Imou OpenAPI client
pub struct ImouClient {
    client: reqwest::Client,
    base_url: String,
    credential: Option<ImouCredential>,
    stamp_source: Arc<dyn StampSource>,
}

impl ImouClient {
    /// Create a new client against the given API base
    pub fn new(base_url: String, credential: Option<ImouCredential>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(types::CLIENT_USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            credential,
            stamp_source: Arc::new(SystemStampSource),
        }
    }

    /// Replace the freshness source (deterministic envelopes in tests)
    pub fn with_stamp_source(mut self, stamp_source: Arc<dyn StampSource>) -> Self {
        self.stamp_source = stamp_source;
        self
    }

    /// Whether a credential pair was configured
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Acquire a vendor access token using the configured credential
    pub async fn acquire_token(&self) -> Result<TokenGrant> {
        let result = self.dispatch(Operation::TokenAcquire, &None, None).await?;
        TokenGrant::from_result(result)
    }

    /// Fetch the HLS live stream URL for a device
    pub async fn fetch_stream(&self, request: StreamFetchRequest) -> Result<StreamGrant> {
        let device_id = types::require_field(&request.device_id, "deviceId")?;
        let params = StreamParams::hls_main(device_id.to_string());

        let result = self
            .dispatch(
                Operation::StreamFetch,
                &request.access_token,
                Some(serde_json::to_value(&params)?),
            )
            .await?;

        Ok(StreamGrant::from_result(result))
    }

    /// List the devices bound to the account behind the access token
    pub async fn list_devices(&self, request: DeviceListRequest) -> Result<DeviceInventory> {
        let result = self
            .dispatch(
                Operation::DeviceList,
                &request.access_token,
                Some(serde_json::json!({})),
            )
            .await?;

        Ok(DeviceInventory::from_result(result))
    }

    /// Shared relay pipeline: validate the token requirement, stamp, sign,
    /// send, interpret.
    ///
    /// The signature covers every envelope field present at signing time;
    /// the params block is never part of the signed material.
    async fn dispatch(
        &self,
        op: Operation,
        access_token: &Option<String>,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let access_token = if op.requires_access_token() {
            Some(types::require_field(access_token, "accessToken")?.to_string())
        } else {
            None
        };

        let credential = self.credential.as_ref().ok_or_else(|| {
            Error::Config("Missing Imou credentials (IMOU_APP_ID / IMOU_APP_SECRET)".to_string())
        })?;

        let envelope = build_envelope(credential, self.stamp_source.stamp(), access_token);
        let url = format!("{}{}", self.base_url, op.endpoint_path());

        tracing::debug!(operation = %op, url = %url, "Relaying Imou API call");

        let response = self
            .client
            .post(&url)
            .json(&VendorRequest {
                system: envelope,
                params,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport {
                status: Some(status.as_u16()),
                message: format!("Imou API returned HTTP {}", status),
            });
        }

        let vendor: VendorResponse = response.json().await?;
        tracing::debug!(operation = %op, code = %vendor.code, "Imou API answered");

        vendor.into_result(op.fallback_error())
    }
}

/// Assemble and sign the system envelope for one call
fn build_envelope(
    credential: &ImouCredential,
    stamp: EnvelopeStamp,
    access_token: Option<String>,
) -> SystemEnvelope {
    let mut fields: Vec<(&str, String)> = vec![
        ("ver", types::PROTOCOL_VERSION.to_string()),
        ("appId", credential.app_id.clone()),
        ("time", stamp.time.to_string()),
        ("nonce", stamp.nonce.clone()),
    ];
    if let Some(ref token) = access_token {
        fields.push(("accessToken", token.clone()));
    }

    let sign = sign::sign(&fields, &credential.app_secret);

    SystemEnvelope {
        ver: types::PROTOCOL_VERSION.to_string(),
        app_id: credential.app_id.clone(),
        time: stamp.time,
        nonce: stamp.nonce,
        access_token,
        sign,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    /// Fixed stamp for deterministic envelopes
    struct FixedStampSource {
        time: i64,
        nonce: &'static str,
    }

    impl StampSource for FixedStampSource {
        fn stamp(&self) -> EnvelopeStamp {
            EnvelopeStamp {
                time: self.time,
                nonce: self.nonce.to_string(),
            }
        }
    }

    fn test_credential() -> ImouCredential {
        ImouCredential {
            app_id: "app1".to_string(),
            app_secret: "shh".to_string(),
        }
    }

    async fn spawn_vendor(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_build_envelope_deterministic() {
        let stamp = EnvelopeStamp {
            time: 1_700_000_000_000,
            nonce: "abcd1234".to_string(),
        };

        let first = build_envelope(&test_credential(), stamp.clone(), None);
        let second = build_envelope(&test_credential(), stamp, None);

        assert_eq!(first.sign, second.sign);
        assert_eq!(first.sign.len(), 32);
        assert!(first.access_token.is_none());
    }

    #[test]
    fn test_build_envelope_signs_access_token() {
        let stamp = EnvelopeStamp {
            time: 1,
            nonce: "n".to_string(),
        };

        let anonymous = build_envelope(&test_credential(), stamp.clone(), None);
        let authed = build_envelope(&test_credential(), stamp, Some("tok".to_string()));

        assert_ne!(anonymous.sign, authed.sign);
        assert_eq!(authed.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_system_stamp_source_nonce_shape() {
        let stamp = SystemStampSource.stamp();
        assert_eq!(stamp.nonce.len(), types::NONCE_LEN);
        assert!(stamp.nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(stamp.time > 0);
    }

    #[tokio::test]
    async fn test_stream_fetch_missing_device_id_short_circuits() {
        // An unroutable base URL: reaching the network would surface as a
        // transport error, not a validation error
        let client = ImouClient::new("http://127.0.0.1:1".to_string(), Some(test_credential()));

        let request = StreamFetchRequest {
            device_id: None,
            access_token: Some("tok".to_string()),
        };
        let err = client.fetch_stream(request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let request = StreamFetchRequest {
            device_id: Some(String::new()),
            access_token: Some("tok".to_string()),
        };
        let err = client.fetch_stream(request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_stream_fetch_missing_token_short_circuits() {
        let client = ImouClient::new("http://127.0.0.1:1".to_string(), Some(test_credential()));

        let request = StreamFetchRequest {
            device_id: Some("dev1".to_string()),
            access_token: None,
        };
        let err = client.fetch_stream(request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_operations_without_credential_are_config_errors() {
        let client = ImouClient::new("http://127.0.0.1:1".to_string(), None);

        let err = client.acquire_token().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = client
            .list_devices(DeviceListRequest {
                access_token: Some("tok".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_acquire_token_end_to_end() {
        let vendor = Router::new().route(
            "/openapi/accessToken",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["system"]["ver"], "1.0");
                assert_eq!(body["system"]["appId"], "app1");
                assert_eq!(body["system"]["time"], 42);
                assert_eq!(body["system"]["nonce"], "fixed123");
                assert_eq!(body["system"]["sign"].as_str().unwrap().len(), 32);
                assert!(body["system"].get("accessToken").is_none());
                assert!(body.get("params").is_none());

                Json(json!({
                    "code": "200",
                    "msg": "success",
                    "result": {"accessToken": "X", "expireTime": 123}
                }))
            }),
        );
        let base = spawn_vendor(vendor).await;

        let client = ImouClient::new(base, Some(test_credential())).with_stamp_source(Arc::new(
            FixedStampSource {
                time: 42,
                nonce: "fixed123",
            },
        ));

        let grant = client.acquire_token().await.unwrap();
        assert!(grant.success);
        assert_eq!(grant.token, "X");
        assert_eq!(grant.expire_time, 123);
    }

    #[tokio::test]
    async fn test_fetch_stream_envelope_and_params() {
        let vendor = Router::new().route(
            "/openapi/getLiveStreamApi",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["system"]["accessToken"], "tok");
                assert_eq!(body["system"]["appId"], "app1");
                assert!(body["system"]["sign"].is_string());
                assert_eq!(body["params"]["deviceId"], "dev1");
                assert_eq!(body["params"]["streamId"], 0);
                assert_eq!(body["params"]["protocol"], "hls");

                Json(json!({
                    "code": "200",
                    "result": {"url": "https://cdn.example/live.m3u8"}
                }))
            }),
        );
        let base = spawn_vendor(vendor).await;

        let client = ImouClient::new(base, Some(test_credential()));
        let grant = client
            .fetch_stream(StreamFetchRequest {
                device_id: Some("dev1".to_string()),
                access_token: Some("tok".to_string()),
            })
            .await
            .unwrap();

        assert!(grant.success);
        assert_eq!(grant.stream_url.as_deref(), Some("https://cdn.example/live.m3u8"));
        assert_eq!(grant.stream_info["url"], "https://cdn.example/live.m3u8");
    }

    #[tokio::test]
    async fn test_vendor_failure_normalizes_code_and_message() {
        let vendor = Router::new().route(
            "/openapi/deviceList",
            post(|| async { Json(json!({"code": "9999", "msg": "bad request"})) }),
        );
        let base = spawn_vendor(vendor).await;

        let client = ImouClient::new(base, Some(test_credential()));
        let err = client
            .list_devices(DeviceListRequest {
                access_token: Some("tok".to_string()),
            })
            .await
            .unwrap_err();

        match err {
            Error::Vendor { code, message } => {
                assert_eq!(code, "9999");
                assert_eq!(message, "bad request");
            }
            other => panic!("expected vendor error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_devices_defaults_to_empty() {
        let vendor = Router::new().route(
            "/openapi/deviceList",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["params"], json!({}));
                Json(json!({"code": "200", "result": {}}))
            }),
        );
        let base = spawn_vendor(vendor).await;

        let client = ImouClient::new(base, Some(test_credential()));
        let inventory = client
            .list_devices(DeviceListRequest {
                access_token: Some("tok".to_string()),
            })
            .await
            .unwrap();

        assert!(inventory.success);
        assert!(inventory.devices.is_empty());
    }

    #[tokio::test]
    async fn test_non_2xx_is_transport_error() {
        let vendor = Router::new().route(
            "/openapi/deviceList",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = spawn_vendor(vendor).await;

        let client = ImouClient::new(base, Some(test_credential()));
        let err = client
            .list_devices(DeviceListRequest {
                access_token: Some("tok".to_string()),
            })
            .await
            .unwrap_err();

        match err {
            Error::Transport { status, .. } => assert_eq!(status, Some(503)),
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
