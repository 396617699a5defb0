/// HTTP client for the detection service and the dashboard service.
///
/// Built on the synchronous `ureq` client. Two base URLs are configured:
///
/// - **Dashboard base**: read-only metrics, charts, status, recent
///   detections and error logs. Sent with `X-Client-Type: Web Portal Dashboard`.
/// - **Detection base**: detection CRUD, uploads and statistics. Sent with
///   `X-Client-Type: Web Portal`.
///
/// Every request carries `X-Requested-With: XMLHttpRequest`; mutating
/// requests also carry `X-Device-Info` with the serialized fingerprint.
/// Nothing is retried. A failed call returns an [`ApiError`] and the caller
/// decides what to do with it.
pub mod error;
pub mod upload;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::DetwatchConfig;
use crate::fingerprint::{self, Environment};
use crate::model::{
    Analytics, ChartSeries, Detection, DetectionListing, DetectionOutcome, ErrorLogEntry,
    MetricsSnapshot, ServiceStatus,
};

pub use error::{ApiError, ApiResult};
pub use upload::{ImageUpload, MultipartBody, validate_image_url, validate_upload};

const REQUESTED_WITH: &str = "XMLHttpRequest";

// ---------------------------------------------------------------------------
// Dashboard reads
// ---------------------------------------------------------------------------

/// Read endpoints the poller depends on.
///
/// [`ApiClient`] is the real implementation; tests substitute fakes.
pub trait DashboardApi: Send + Sync {
    fn metrics(&self) -> ApiResult<MetricsSnapshot>;
    fn chart_data(&self, timeframe: &str) -> ApiResult<ChartSeries>;
    fn detection_categories(&self) -> ApiResult<ChartSeries>;
    fn analytics(&self, timeframe: &str) -> ApiResult<Analytics>;
    fn response_time_data(&self, timeframe: &str) -> ApiResult<ChartSeries>;
    fn system_status(&self) -> ApiResult<Vec<ServiceStatus>>;
    fn recent_detections(&self, limit: u32) -> ApiResult<Vec<Detection>>;
    fn error_logs(&self, limit: u32) -> ApiResult<Vec<ErrorLogEntry>>;
    /// `true` iff `GET /metrics` answers 2xx.
    fn probe(&self) -> bool;
}

/// Filters for the paginated detection listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionQuery {
    pub page: u32,
    pub size: u32,
    /// `all` is treated as no filter.
    pub category: Option<String>,
    pub device: Option<String>,
    pub search: Option<String>,
}

impl Default for DetectionQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 20,
            category: None,
            device: None,
            search: None,
        }
    }
}

impl DetectionQuery {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(category) = self.category.as_deref()
            && !category.is_empty()
            && category != "all"
        {
            pairs.push(("category", category.to_string()));
        }
        if let Some(device) = self.device.as_deref().filter(|d| !d.is_empty()) {
            pairs.push(("device", device.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

enum Payload<'a> {
    Empty,
    Json(&'a serde_json::Value),
    Bytes(&'a [u8]),
}

/// Synchronous client for both services.
#[derive(Debug, Clone)]
pub struct ApiClient {
    detection_base: Url,
    dashboard_base: Url,
    timeout: Duration,
    dashboard_client_type: String,
    portal_client_type: String,
    max_upload_bytes: u64,
}

impl ApiClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &DetwatchConfig) -> Result<Self> {
        Ok(Self {
            detection_base: parse_base(&config.services.detection_url)
                .context("invalid services.detection_url")?,
            dashboard_base: parse_base(&config.services.dashboard_url)
                .context("invalid services.dashboard_url")?,
            timeout: Duration::from_millis(config.services.timeout_ms),
            dashboard_client_type: config.client.dashboard_client_type.clone(),
            portal_client_type: config.client.portal_client_type.clone(),
            max_upload_bytes: config.upload.max_bytes,
        })
    }

    pub fn detection_base(&self) -> &str {
        self.detection_base.as_str()
    }

    pub fn dashboard_base(&self) -> &str {
        self.dashboard_base.as_str()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    // -- detection service --------------------------------------------------

    /// `GET /detect/{id}`. A 404 is `Ok(None)`.
    pub fn get_detection(&self, id: &str) -> ApiResult<Option<Detection>> {
        let url = endpoint(&self.detection_base, &["detect", id]);
        match self.portal_get(&url, &[]) {
            Ok(detection) => Ok(Some(detection)),
            Err(ApiError::NotFound) => {
                log::warn!("detection not found: {id}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// `GET /detect?page=&size=&category=&device=&search=`.
    pub fn list_detections(&self, query: &DetectionQuery) -> ApiResult<DetectionListing> {
        let url = endpoint(&self.detection_base, &["detect"]);
        let pairs = query.pairs();
        let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.portal_get(&url, &borrowed)
    }

    /// `GET /detect/statistics?timeframe=`. The shape is service-defined.
    pub fn statistics(&self, timeframe: &str) -> ApiResult<serde_json::Value> {
        let url = endpoint(&self.detection_base, &["detect", "statistics"]);
        self.portal_get(&url, &[("timeframe", timeframe)])
    }

    /// `POST /detect` with a multipart `image` field.
    ///
    /// The upload is validated first; an invalid upload never touches the
    /// network.
    pub fn detect_file(
        &self,
        upload: Option<&ImageUpload>,
        env: &Environment,
    ) -> ApiResult<DetectionOutcome> {
        let upload = validate_upload(upload, self.max_upload_bytes)?;
        let body = MultipartBody::image(upload);
        let url = endpoint(&self.detection_base, &["detect"]);

        let request = self
            .portal_request("POST", &url, Some(env))
            .set("Content-Type", &body.content_type());
        let resp = send(request, Payload::Bytes(&body.bytes), None)?;
        outcome(&url, resp)
    }

    /// `POST /detect/url` with `{"url": ...}`.
    pub fn detect_url(&self, raw_url: &str, env: &Environment) -> ApiResult<DetectionOutcome> {
        let image_url = validate_image_url(raw_url)?;
        let url = endpoint(&self.detection_base, &["detect", "url"]);
        let body = serde_json::json!({ "url": image_url.as_str() });

        let request = self.portal_request("POST", &url, Some(env));
        let resp = send(request, Payload::Json(&body), None)?;
        outcome(&url, resp)
    }

    /// `DELETE /detect/{id}`.
    ///
    /// 404 is [`ApiError::NotFound`]; other failures carry the server's
    /// `error` message, or "Failed to delete detection" when it sent none.
    pub fn delete_detection(&self, id: &str, env: &Environment) -> ApiResult<serde_json::Value> {
        let url = endpoint(&self.detection_base, &["detect", id]);
        let request = self.portal_request("DELETE", &url, Some(env));
        let resp = send(request, Payload::Empty, Some("Failed to delete detection"))?;
        let body = read_body(&url, resp)?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        decode(&url, &body)
    }

    // -- request plumbing ---------------------------------------------------

    fn dashboard_get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<T> {
        let url = endpoint(&self.dashboard_base, &[path]);
        let mut request = ureq::get(&url)
            .timeout(self.timeout)
            .set("X-Requested-With", REQUESTED_WITH)
            .set("X-Client-Type", &self.dashboard_client_type);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let resp = send(request, Payload::Empty, None)?;
        decode(&url, &read_body(&url, resp)?)
    }

    fn portal_get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> ApiResult<T> {
        let mut request = self.portal_request("GET", url, None);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let resp = send(request, Payload::Empty, None)?;
        decode(url, &read_body(url, resp)?)
    }

    fn portal_request(&self, method: &str, url: &str, env: Option<&Environment>) -> ureq::Request {
        let request = ureq::request(method, url)
            .timeout(self.timeout)
            .set("X-Requested-With", REQUESTED_WITH)
            .set("X-Client-Type", &self.portal_client_type);
        match env {
            Some(env) => request.set("X-Device-Info", &fingerprint::fingerprint(env, Utc::now())),
            None => request,
        }
    }
}

impl DashboardApi for ApiClient {
    fn metrics(&self) -> ApiResult<MetricsSnapshot> {
        self.dashboard_get("metrics", &[])
    }

    fn chart_data(&self, timeframe: &str) -> ApiResult<ChartSeries> {
        self.dashboard_get("chart-data", &[("timeframe", timeframe)])
    }

    fn detection_categories(&self) -> ApiResult<ChartSeries> {
        self.dashboard_get("detection-categories", &[])
    }

    fn analytics(&self, timeframe: &str) -> ApiResult<Analytics> {
        self.dashboard_get("analytics", &[("timeframe", timeframe)])
    }

    fn response_time_data(&self, timeframe: &str) -> ApiResult<ChartSeries> {
        self.dashboard_get("response-time-data", &[("timeframe", timeframe)])
    }

    fn system_status(&self) -> ApiResult<Vec<ServiceStatus>> {
        self.dashboard_get("system-status", &[])
    }

    fn recent_detections(&self, limit: u32) -> ApiResult<Vec<Detection>> {
        self.dashboard_get("recent-detections", &[("limit", &limit.to_string())])
    }

    fn error_logs(&self, limit: u32) -> ApiResult<Vec<ErrorLogEntry>> {
        self.dashboard_get("error-logs", &[("limit", &limit.to_string())])
    }

    fn probe(&self) -> bool {
        let url = endpoint(&self.dashboard_base, &["metrics"]);
        let request = ureq::get(&url)
            .timeout(self.timeout)
            .set("X-Requested-With", REQUESTED_WITH)
            .set("X-Client-Type", &self.dashboard_client_type);
        match request.call() {
            Ok(resp) => {
                log::debug!("connection probe: HTTP {}", resp.status());
                true
            }
            Err(e) => {
                log::warn!("connection probe failed: {e}");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a configured base URL.
///
/// On Windows, `localhost` may resolve to `::1` first and stall when the
/// service only binds IPv4, so it is rewritten to `127.0.0.1`.
fn parse_base(raw: &str) -> Result<Url> {
    let raw = raw.trim().replace("://localhost", "://127.0.0.1");
    let url = Url::parse(&raw).with_context(|| format!("'{raw}' is not a URL"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("'{raw}' cannot be used as a base URL");
    }
    Ok(url)
}

/// Append path segments to a base URL, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> String {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.to_string()
}

fn send(
    request: ureq::Request,
    payload: Payload<'_>,
    status_fallback: Option<&str>,
) -> ApiResult<ureq::Response> {
    let url = request.url().to_string();
    let result = match payload {
        Payload::Empty => request.call(),
        Payload::Json(body) => request.send_json(body),
        Payload::Bytes(body) => request.send_bytes(body),
    };
    result.map_err(|err| classify(err, &url, status_fallback))
}

/// Map a `ureq` failure into the taxonomy.
fn classify(err: ureq::Error, url: &str, status_fallback: Option<&str>) -> ApiError {
    match err {
        ureq::Error::Status(404, _) if is_by_id(url) => ApiError::NotFound,
        ureq::Error::Status(code, resp) => {
            let status_text = resp.status_text().to_string();
            let server_error = resp
                .into_string()
                .ok()
                .and_then(|body| server_error_message(&body));
            let message = server_error.unwrap_or_else(|| match status_fallback {
                Some(fallback) => fallback.to_string(),
                None => format!("HTTP {code}: {status_text}"),
            });
            log::debug!("{url} -> HTTP {code}: {message}");
            ApiError::Status { code, message }
        }
        ureq::Error::Transport(transport) => ApiError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

/// Whether `url` addresses a single detection (`/detect/{id}`).
fn is_by_id(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    matches!(segments.as_slice(), [.., "detect", id] if *id != "url" && *id != "statistics")
}

/// The `error` field of a JSON body, if any.
fn server_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.as_str())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

fn read_body(url: &str, resp: ureq::Response) -> ApiResult<String> {
    resp.into_string().map_err(|e| ApiError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Decode an upload reply, lifting an embedded `error` into
/// [`ApiError::Application`].
fn outcome(url: &str, resp: ureq::Response) -> ApiResult<DetectionOutcome> {
    let parsed: DetectionOutcome = decode(url, &read_body(url, resp)?)?;
    match parsed.error.as_deref() {
        Some(message) if !message.is_empty() => Err(ApiError::Application(message.to_string())),
        _ => Ok(parsed),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
