//! Wire types for the dashboard and detection services.
//!
//! Every payload is deserialized leniently: the services omit fields, send
//! numbers as strings, and use two bounding-box shapes. Normalization
//! happens here so renderers only see one canonical shape.

pub mod geometry;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub use geometry::{BoundingBox, Rect, normalize_bounding_box};

// ---------------------------------------------------------------------------
// Numeric values
// ---------------------------------------------------------------------------

/// A number that may arrive as a JSON number or as a numeric string
/// (the mock server sends `errorRate` as `"1.2"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    /// Numeric value, parsing text when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Number(n) => write!(f, "{}", crate::format::format_number(*n)),
            Numeric::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Numeric {
    fn from(n: f64) -> Self {
        Numeric::Number(n)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// `GET /metrics`: point-in-time dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsSnapshot {
    pub active_sessions: Option<Numeric>,
    pub api_calls: Option<Numeric>,
    /// Milliseconds.
    pub response_time: Option<Numeric>,
    /// Percent.
    pub error_rate: Option<Numeric>,
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

/// Parallel `labels`/`data` arrays consumed by every chart.
///
/// Deserialization rejects series whose arrays differ in length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl ChartSeries {
    pub fn new(labels: Vec<String>, data: Vec<f64>) -> Result<Self, String> {
        if labels.len() != data.len() {
            return Err(format!(
                "chart series has {} labels but {} values",
                labels.len(),
                data.len()
            ));
        }
        Ok(Self { labels, data })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.data.iter().copied())
    }
}

#[derive(Deserialize)]
struct RawSeries {
    #[serde(default)]
    labels: Vec<LabelValue>,
    #[serde(default)]
    data: Vec<Numeric>,
}

/// Labels are usually strings, but hour buckets sometimes come as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelValue {
    Text(String),
    Number(f64),
}

impl TryFrom<RawSeries> for ChartSeries {
    type Error = String;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        let labels = raw
            .labels
            .into_iter()
            .map(|l| match l {
                LabelValue::Text(s) => s,
                LabelValue::Number(n) => crate::format::format_number(n),
            })
            .collect();
        let data = raw
            .data
            .iter()
            .map(|v| v.as_f64().ok_or_else(|| format!("non-numeric chart value: {v}")))
            .collect::<Result<Vec<_>, _>>()?;
        ChartSeries::new(labels, data)
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// `GET /analytics?timeframe=`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
    pub performance: Option<Performance>,
    pub device_distribution: Option<ChartSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Performance {
    pub avg_confidence: Option<Numeric>,
    pub success_rate: Option<Numeric>,
    pub avg_objects_per_frame: Option<Numeric>,
    pub unique_users: Option<Numeric>,
}

// ---------------------------------------------------------------------------
// System status
// ---------------------------------------------------------------------------

/// One row of `GET /system-status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceStatus {
    pub service: String,
    pub status: String,
    /// `success`, `warning`, or anything else (rendered as danger).
    pub status_class: String,
    /// Percent, 0–100.
    pub load: f64,
    pub uptime: String,
    pub last_update: String,
}

// ---------------------------------------------------------------------------
// Error logs
// ---------------------------------------------------------------------------

/// Severity of an [`ErrorLogEntry`]. Unknown levels behave like INFO but
/// keep their original text for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    Error,
    Warn,
    Info(String),
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info(raw) => raw,
        }
    }
}

impl From<String> for LogLevel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "ERROR" => LogLevel::Error,
            "WARN" => LogLevel::Warn,
            _ => LogLevel::Info(raw),
        }
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info("INFO".to_string())
    }
}

/// One entry of `GET /error-logs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogEntry {
    pub level: LogLevel,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: String,
    pub timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// One completed inference result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Detection {
    #[serde(deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub file_name: Option<String>,
    pub device: Option<String>,
    /// Milliseconds.
    pub processing_time: Option<Numeric>,
    pub image_url: Option<String>,
    #[serde(deserialize_with = "vec_or_null")]
    pub objects: Vec<DetectedObject>,
}

impl Detection {
    /// Identifier used to correlate rendered items with this record: the
    /// server id when present, otherwise the client-derived surrogate.
    pub fn key(&self) -> String {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => crate::format::client_detection_id(
                self.timestamp.as_deref(),
                self.device.as_deref(),
                self.objects.len(),
            ),
        }
    }
}

/// One object found in a detection, with its box already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDetectedObject")]
pub struct DetectedObject {
    pub label: Option<String>,
    /// Score in `[0, 1]`.
    pub confidence: f64,
    pub bounds: Option<Rect>,
}

#[derive(Deserialize)]
struct RawDetectedObject {
    #[serde(default, alias = "className")]
    label: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, rename = "box", alias = "boundingBox")]
    bbox: Option<BoundingBox>,
}

impl From<RawDetectedObject> for DetectedObject {
    fn from(raw: RawDetectedObject) -> Self {
        Self {
            label: raw.label,
            confidence: raw.confidence.unwrap_or(0.0),
            bounds: raw.bbox.map(|b| b.normalize()),
        }
    }
}

/// Body returned by `POST /detect` and `POST /detect/url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionOutcome {
    /// Application-level failure reported inside a 2xx body.
    pub error: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub image_url: Option<String>,
    pub original_image_url: Option<String>,
    #[serde(alias = "processingTime")]
    pub processing_time_ms: Option<Numeric>,
    #[serde(alias = "objects", deserialize_with = "vec_or_null")]
    pub detected_objects: Vec<DetectedObject>,
}

/// `GET /detect?page=&size=...`: either a bare array or a page envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionListing {
    Plain(Vec<Detection>),
    Page(DetectionPage),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionPage {
    pub content: Vec<Detection>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub number: Option<u64>,
}

impl DetectionListing {
    pub fn detections(&self) -> &[Detection] {
        match self {
            DetectionListing::Plain(items) => items,
            DetectionListing::Page(page) => &page.content,
        }
    }

    /// Total across all pages, when the service reports it.
    pub fn total(&self) -> Option<u64> {
        match self {
            DetectionListing::Plain(items) => Some(items.len() as u64),
            DetectionListing::Page(page) => page.total_elements,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Accept `"abc"`, `42`, or `null` as an optional string id.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Treat an explicit `null` list as empty.
fn vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_accept_numbers_and_strings() {
        let json = r#"{"activeSessions":12,"apiCalls":3456,"responseTime":420,"errorRate":"1.2"}"#;
        let m: MetricsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(m.active_sessions, Some(Numeric::Number(12.0)));
        assert_eq!(m.error_rate, Some(Numeric::Text("1.2".to_string())));
        assert_eq!(m.error_rate.unwrap().as_f64(), Some(1.2));
    }

    #[test]
    fn numeric_display_drops_integer_fraction() {
        assert_eq!(Numeric::Number(420.0).to_string(), "420");
        assert_eq!(Numeric::Number(87.5).to_string(), "87.5");
        assert_eq!(Numeric::Text("1.2".into()).to_string(), "1.2");
    }

    #[test]
    fn chart_series_rejects_mismatched_lengths() {
        let bad = r#"{"labels":["a","b"],"data":[1]}"#;
        assert!(serde_json::from_str::<ChartSeries>(bad).is_err());

        let good = r#"{"labels":["a",3],"data":[1,"2.5"]}"#;
        let series: ChartSeries = serde_json::from_str(good).unwrap();
        assert_eq!(series.labels, vec!["a", "3"]);
        assert_eq!(series.data, vec![1.0, 2.5]);
    }

    #[test]
    fn detection_deserializes_with_missing_fields() {
        let d: Detection = serde_json::from_str(r#"{"timestamp":"2024-01-01T00:00:00Z"}"#).unwrap();
        assert!(d.id.is_none());
        assert!(d.objects.is_empty());
        assert!(d.key().starts_with("det_"));
    }

    #[test]
    fn detection_accepts_numeric_id_and_null_objects() {
        let d: Detection = serde_json::from_str(r#"{"id":42,"objects":null}"#).unwrap();
        assert_eq!(d.id.as_deref(), Some("42"));
        assert_eq!(d.key(), "42");
        assert!(d.objects.is_empty());
    }

    #[test]
    fn detected_object_normalizes_either_box_key() {
        let json = r#"[
            {"label":"cat","confidence":0.9,"box":{"xMin":1,"yMin":2,"xMax":5,"yMax":6}},
            {"className":"dog","confidence":0.5,"boundingBox":{"x":1,"y":2,"width":4,"height":4}},
            {"label":"bird"}
        ]"#;
        let objects: Vec<DetectedObject> = serde_json::from_str(json).unwrap();
        assert_eq!(objects[0].bounds, objects[1].bounds);
        assert_eq!(objects[1].label.as_deref(), Some("dog"));
        assert_eq!(objects[2].confidence, 0.0);
        assert!(objects[2].bounds.is_none());
    }

    #[test]
    fn log_level_keeps_unknown_text() {
        let entries: Vec<ErrorLogEntry> = serde_json::from_str(
            r#"[{"level":"ERROR","message":"boom"},{"level":"DEBUG","type":"Trace","message":"x"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[1].level.as_str(), "DEBUG");
        assert_eq!(entries[1].kind.as_deref(), Some("Trace"));
    }

    #[test]
    fn outcome_reads_error_and_objects() {
        let ok: DetectionOutcome = serde_json::from_str(
            r#"{"processingTimeMs":120,"detectedObjects":[{"label":"cat","confidence":0.8}]}"#,
        )
        .unwrap();
        assert!(ok.error.is_none());
        assert_eq!(ok.detected_objects.len(), 1);

        let failed: DetectionOutcome =
            serde_json::from_str(r#"{"error":"Model not loaded"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("Model not loaded"));
    }

    #[test]
    fn listing_accepts_array_or_page() {
        let plain: DetectionListing = serde_json::from_str(r#"[{"id":"a"},{"id":"b"}]"#).unwrap();
        assert_eq!(plain.detections().len(), 2);
        assert_eq!(plain.total(), Some(2));

        let page: DetectionListing = serde_json::from_str(
            r#"{"content":[{"id":"a"}],"totalElements":40,"totalPages":2,"number":0}"#,
        )
        .unwrap();
        assert_eq!(page.detections().len(), 1);
        assert_eq!(page.total(), Some(40));
    }
}
