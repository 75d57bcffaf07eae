//! Core `KioskBackend` trait and `HttpBackend` implementation.
//!
//! `HttpBackend` speaks the kiosk backend's JSON API.  All connection details
//! come from [`BackendConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::backend::types::{
    BaseWeightResponse, CaptureResponse, Classification, ClassifyResponse, ProcessWasteRequest,
    ProcessWasteResponse, SortOutcome, StatusResponse,
};
use crate::config::BackendConfig;
use crate::peripheral::PeripheralStatus;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the backend.
///
/// Every variant is treated the same way by the pipeline (the stage fails);
/// the distinction only shapes the message shown to the operator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, reset mid-response ...
    #[error("backend unreachable: {0}")]
    Connection(String),

    #[error("backend request timed out")]
    Timeout,

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body was not the expected JSON shape.
    #[error("malformed backend response: {0}")]
    Parse(String),

    /// A base64 payload (`image`, `qr_code`) could not be decoded.
    #[error("invalid base64 in `{field}`: {reason}")]
    Decode { field: &'static str, reason: String },
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_decode() {
            BackendError::Parse(e.to_string())
        } else {
            BackendError::Connection(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// KioskBackend trait
// ---------------------------------------------------------------------------

/// One async method per backend endpoint.
///
/// Implementors must be `Send + Sync` so they can be shared between the
/// poller and the controller behind an `Arc<dyn KioskBackend>`.
#[async_trait]
pub trait KioskBackend: Send + Sync {
    /// `GET /status`: peripheral reachability.
    async fn status(&self) -> Result<PeripheralStatus, BackendError>;

    /// `POST /measure-base`: tare reading of the empty tray, in grams.
    async fn measure_base(&self) -> Result<f64, BackendError>;

    /// `POST /capture`: JPEG bytes of the item on the tray.
    async fn capture(&self) -> Result<Vec<u8>, BackendError>;

    /// `POST /classify`: classify the last captured image.
    async fn classify(&self) -> Result<Classification, BackendError>;

    /// `POST /process-waste`: drive the sorter for `waste_type` and weigh
    /// the item.
    async fn process_waste(&self, waste_type: &str) -> Result<SortOutcome, BackendError>;
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// `reqwest` client for the kiosk backend.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build an `HttpBackend` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default client is used if the builder fails.
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn post_empty<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, BackendError> {
        let response = self.client.post(self.url(endpoint)).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl KioskBackend for HttpBackend {
    async fn status(&self) -> Result<PeripheralStatus, BackendError> {
        let response = self.client.get(self.url("status")).send().await?;
        let body: StatusResponse = read_json(response).await?;
        Ok(PeripheralStatus {
            hardware_online: body.arduino_connected,
            camera_online: body.camera_available,
        })
    }

    async fn measure_base(&self) -> Result<f64, BackendError> {
        let body: BaseWeightResponse = self.post_empty("measure-base").await?;
        Ok(body.weight)
    }

    async fn capture(&self) -> Result<Vec<u8>, BackendError> {
        let body: CaptureResponse = self.post_empty("capture").await?;
        decode_base64("image", &body.image)
    }

    async fn classify(&self) -> Result<Classification, BackendError> {
        let body: ClassifyResponse = self.post_empty("classify").await?;
        Ok(body.into())
    }

    async fn process_waste(&self, waste_type: &str) -> Result<SortOutcome, BackendError> {
        let response = self
            .client
            .post(self.url("process-waste"))
            .json(&ProcessWasteRequest { waste_type })
            .send()
            .await?;
        let body: ProcessWasteResponse = read_json(response).await?;

        Ok(SortOutcome {
            weight: body.weight,
            amount: body.amount,
            id: body.id,
            qr_code: decode_base64("qr_code", &body.qr_code)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Turn a response into `T`, mapping any non-2xx status to
/// [`BackendError::Status`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            status: status.as_u16(),
            detail: error_detail(&body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))
}

/// Extract a readable message from an error body.
///
/// The backend reports failures as `{"detail": "..."}`; anything else is
/// passed through as trimmed text.
pub(crate) fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = json.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.to_string()
    }
}

fn decode_base64(field: &'static str, data: &str) -> Result<Vec<u8>, BackendError> {
    general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| BackendError::Decode {
            field,
            reason: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a];

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn backend_at(base_url: String) -> HttpBackend {
        HttpBackend::from_config(&BackendConfig {
            base_url,
            timeout_secs: 5,
        })
    }

    fn happy_router() -> Router {
        Router::new()
            .route(
                "/status",
                get(|| async {
                    Json(json!({ "arduino_connected": true, "camera_available": false }))
                }),
            )
            .route(
                "/measure-base",
                post(|| async { Json(json!({ "weight": 42.0 })) }),
            )
            .route(
                "/capture",
                post(|| async { Json(json!({ "image": general_purpose::STANDARD.encode(JPEG) })) }),
            )
            .route(
                "/classify",
                post(|| async { Json(json!({ "category": "plastic", "type": "PET" })) }),
            )
            .route(
                "/process-waste",
                post(|Json(body): Json<Value>| async move {
                    let waste_type = body["type"].as_str().unwrap_or("").to_string();
                    Json(json!({
                        "weight": 18.5,
                        "amount": 0.37,
                        "id": format!("QR_{waste_type}"),
                        "qr_code": general_purpose::STANDARD.encode(PNG),
                    }))
                }),
            )
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _backend = HttpBackend::from_config(&BackendConfig::default());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let backend = backend_at("http://localhost:8000/".into());
        assert_eq!(backend.url("status"), "http://localhost:8000/status");
    }

    #[test]
    fn backend_is_object_safe() {
        let backend: Box<dyn KioskBackend> =
            Box::new(HttpBackend::from_config(&BackendConfig::default()));
        drop(backend);
    }

    #[test]
    fn error_detail_prefers_json_detail() {
        assert_eq!(
            error_detail(r#"{"detail":"Arduino not connected"}"#),
            "Arduino not connected"
        );
        assert_eq!(error_detail("  Scale timeout \n"), "Scale timeout");
        assert_eq!(error_detail(""), "no response body");
        assert_eq!(error_detail(r#"{"error":"x"}"#), r#"{"error":"x"}"#);
    }

    #[tokio::test]
    async fn status_maps_wire_fields() {
        let backend = backend_at(serve(happy_router()).await);

        let status = backend.status().await.expect("status");

        assert_eq!(
            status,
            PeripheralStatus {
                hardware_online: true,
                camera_online: false,
            }
        );
    }

    #[tokio::test]
    async fn full_stage_sequence_decodes_payloads() {
        let backend = backend_at(serve(happy_router()).await);

        assert_eq!(backend.measure_base().await.expect("base"), 42.0);
        assert_eq!(backend.capture().await.expect("capture"), JPEG.to_vec());

        let classification = backend.classify().await.expect("classify");
        assert_eq!(classification, Classification::new("plastic", "PET"));

        let outcome = backend.process_waste("PET").await.expect("sort");
        assert_eq!(outcome.weight, 18.5);
        assert_eq!(outcome.amount, 0.37);
        assert_eq!(outcome.id, "QR_PET");
        assert_eq!(outcome.qr_code, PNG.to_vec());
    }

    #[tokio::test]
    async fn server_error_surfaces_detail() {
        let router = Router::new().route(
            "/process-waste",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Scale timeout" })),
                )
            }),
        );
        let backend = backend_at(serve(router).await);

        let err = backend.process_waste("DRY").await.unwrap_err();

        assert_eq!(
            err,
            BackendError::Status {
                status: 500,
                detail: "Scale timeout".into(),
            }
        );
    }

    #[tokio::test]
    async fn missing_route_is_a_status_error() {
        let backend = backend_at(serve(Router::new()).await);

        let err = backend.measure_base().await.unwrap_err();

        assert!(matches!(err, BackendError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn wrong_shape_is_a_parse_error() {
        let router = Router::new().route(
            "/measure-base",
            post(|| async { Json(json!({ "grams": 42 })) }),
        );
        let backend = backend_at(serve(router).await);

        let err = backend.measure_base().await.unwrap_err();

        assert!(matches!(err, BackendError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn bad_base64_is_a_decode_error() {
        let router = Router::new().route(
            "/capture",
            post(|| async { Json(json!({ "image": "not base64 at all!" })) }),
        );
        let backend = backend_at(serve(router).await);

        let err = backend.capture().await.unwrap_err();

        assert!(matches!(err, BackendError::Decode { field: "image", .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_connection_error() {
        // Bind then drop to get a local port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let backend = backend_at(format!("http://{addr}"));

        let err = backend.status().await.unwrap_err();

        assert!(matches!(err, BackendError::Connection(_)), "got {err:?}");
    }
}
