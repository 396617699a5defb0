//! In-memory dashboard view.
//!
//! Holds the rendered HTML of every section, the chart registry, and the
//! lookup table from detection key to detection. The poller writes into it;
//! the web front and CLI read from it. Sections are replaced wholesale and a
//! section that failed to load simply keeps its previous content.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::{ApiError, ApiResult};
use crate::model::{
    Analytics, ChartSeries, Detection, DetectionOutcome, ErrorLogEntry, MetricsSnapshot,
    ServiceStatus,
};
use crate::render::{self, ChartRegistry, charts};

/// Replaceable regions of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Metrics,
    Analytics,
    SystemStatus,
    Detections,
    ErrorLogs,
    Connection,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Metrics => "metrics",
            Section::Analytics => "analytics",
            Section::SystemStatus => "system-status",
            Section::Detections => "detections",
            Section::ErrorLogs => "error-logs",
            Section::Connection => "connection",
        }
    }
}

/// The view as shared between the poller and request handlers.
pub type SharedView = Arc<Mutex<DashboardView>>;

pub fn shared(view: DashboardView) -> SharedView {
    Arc::new(Mutex::new(view))
}

/// Lock the view. A panic in another holder leaves the sections intact, so
/// a poisoned lock is recovered rather than propagated.
pub fn lock(view: &SharedView) -> MutexGuard<'_, DashboardView> {
    view.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything the page needs to draw itself, as sent by `GET /api/view`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub sections: BTreeMap<Section, String>,
    pub charts: ChartRegistry,
    pub timeframe: String,
    pub chart_timeframe: String,
    /// `None` until the connectivity probe has answered.
    pub connected: Option<bool>,
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    sections: BTreeMap<Section, String>,
    charts: ChartRegistry,
    detections: HashMap<String, Detection>,
    timeframe: String,
    chart_timeframe: String,
    connected: Option<bool>,
    revision: u64,
}

impl DashboardView {
    pub fn new(default_timeframe: &str) -> Self {
        Self {
            sections: BTreeMap::new(),
            charts: ChartRegistry::new(),
            detections: HashMap::new(),
            timeframe: default_timeframe.to_string(),
            chart_timeframe: default_timeframe.to_string(),
            connected: None,
            revision: 0,
        }
    }

    fn replace(&mut self, section: Section, html: String) {
        self.sections.insert(section, html);
        self.revision += 1;
    }

    // -- writers ------------------------------------------------------------

    pub fn apply_metrics(&mut self, metrics: &MetricsSnapshot) {
        self.replace(Section::Metrics, render::metric_tiles(metrics));
    }

    pub fn apply_api_calls_chart(&mut self, series: &ChartSeries) {
        charts::update_api_calls_chart(&mut self.charts, series);
        self.revision += 1;
    }

    pub fn apply_categories(&mut self, series: &ChartSeries) {
        charts::update_category_charts(&mut self.charts, series);
        self.revision += 1;
    }

    pub fn apply_hourly_usage(&mut self, series: &ChartSeries) {
        charts::update_hourly_usage_chart(&mut self.charts, series);
        self.revision += 1;
    }

    pub fn apply_response_time(&mut self, series: &ChartSeries) {
        charts::update_response_time_chart(&mut self.charts, series);
        self.revision += 1;
    }

    /// Performance tiles and the device chart; absent parts leave the
    /// current content untouched.
    pub fn apply_analytics(&mut self, analytics: &Analytics) {
        if let Some(performance) = &analytics.performance {
            self.replace(Section::Analytics, render::analytics_tiles(performance));
        }
        if let Some(distribution) = &analytics.device_distribution {
            charts::update_device_distribution_chart(&mut self.charts, distribution);
            self.revision += 1;
        }
    }

    pub fn apply_system_status(&mut self, services: &[ServiceStatus]) {
        self.replace(Section::SystemStatus, render::status_table(services));
    }

    /// Render the cards and rebuild the lookup table from scratch.
    pub fn apply_recent_detections(&mut self, detections: &[Detection], now: DateTime<Utc>) {
        self.detections = detections
            .iter()
            .map(|d| (d.key(), d.clone()))
            .collect();
        self.replace(Section::Detections, render::detection_cards(detections, now));
    }

    pub fn apply_error_logs(&mut self, entries: &[ErrorLogEntry], now: DateTime<Utc>) {
        self.replace(Section::ErrorLogs, render::error_logs(entries, now));
    }

    /// Record the probe result; a failure shows the connection banner.
    pub fn set_connected(&mut self, connected: bool, dashboard_base: &str) {
        self.connected = Some(connected);
        let html = if connected {
            String::new()
        } else {
            render::connection_banner(dashboard_base)
        };
        self.replace(Section::Connection, html);
    }

    pub fn set_timeframe(&mut self, timeframe: &str) {
        self.timeframe = timeframe.to_string();
        self.revision += 1;
    }

    pub fn set_chart_timeframe(&mut self, timeframe: &str) {
        self.chart_timeframe = timeframe.to_string();
        self.revision += 1;
    }

    // -- readers ------------------------------------------------------------

    pub fn section(&self, section: Section) -> Option<&str> {
        self.sections.get(&section).map(String::as_str)
    }

    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn chart_timeframe(&self) -> &str {
        &self.chart_timeframe
    }

    pub fn connected(&self) -> Option<bool> {
        self.connected
    }

    pub fn lookup(&self, key: &str) -> Option<&Detection> {
        self.detections.get(key)
    }

    /// Detail panel for `key`, or the fallback panel when the key is unknown.
    pub fn detail(&self, key: &str) -> String {
        match self.lookup(key) {
            Some(detection) => render::detail_panel(detection),
            None => render::detail_fallback(),
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            sections: self.sections.clone(),
            charts: self.charts.clone(),
            timeframe: self.timeframe.clone(),
            chart_timeframe: self.chart_timeframe.clone(),
            connected: self.connected,
            revision: self.revision,
        }
    }
}

// ---------------------------------------------------------------------------
// User feedback for mutating actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Error,
}

/// What the page should do after a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFeedback {
    pub alert: AlertKind,
    pub message: String,
    /// Close the detail panel.
    pub close_detail: bool,
    /// Re-fetch the recent detections list.
    pub refresh: bool,
}

pub fn delete_feedback(result: &ApiResult<serde_json::Value>) -> ActionFeedback {
    match result {
        Ok(_) => ActionFeedback {
            alert: AlertKind::Success,
            message: "Detection record deleted successfully".to_string(),
            close_detail: true,
            refresh: true,
        },
        Err(err) => ActionFeedback {
            alert: AlertKind::Error,
            message: format!("Failed to delete detection: {err}"),
            close_detail: false,
            refresh: false,
        },
    }
}

/// Rendered outcome of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFeedback {
    pub ok: bool,
    pub html: String,
    /// Validation failures never reached the service.
    pub rejected_locally: bool,
}

pub fn upload_feedback(result: &ApiResult<DetectionOutcome>) -> UploadFeedback {
    match result {
        Ok(outcome) => UploadFeedback {
            ok: true,
            html: render::upload_result(outcome),
            rejected_locally: false,
        },
        Err(err) => UploadFeedback {
            ok: false,
            html: render::upload_error(&err.to_string()),
            rejected_locally: matches!(err, ApiError::Validation(_)),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ChartName;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn detections(json: &str) -> Vec<Detection> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn recent_detections_rebuild_lookup() {
        let mut view = DashboardView::new("day");
        view.apply_recent_detections(&detections(r#"[{"id":"a"},{"id":"b"}]"#), now());
        assert!(view.lookup("a").is_some());

        view.apply_recent_detections(&detections(r#"[{"id":"c"}]"#), now());
        assert!(view.lookup("a").is_none());
        assert!(view.lookup("c").is_some());
    }

    #[test]
    fn unknown_key_gets_fallback() {
        let view = DashboardView::new("day");
        assert!(view.detail("missing").contains("Data Unavailable"));
    }

    #[test]
    fn analytics_without_performance_keeps_tiles() {
        let mut view = DashboardView::new("day");
        let full: Analytics = serde_json::from_str(
            r#"{"performance":{"avgConfidence":80},"deviceDistribution":{"labels":["Desktop"],"data":[5]}}"#,
        )
        .unwrap();
        view.apply_analytics(&full);
        let tiles = view.section(Section::Analytics).unwrap().to_string();

        view.apply_analytics(&Analytics::default());
        assert_eq!(view.section(Section::Analytics), Some(tiles.as_str()));
        assert_eq!(
            view.charts().get(ChartName::DeviceDistribution).unwrap().labels,
            vec!["Desktop"]
        );
    }

    #[test]
    fn connection_banner_toggles() {
        let mut view = DashboardView::new("day");
        assert_eq!(view.connected(), None);
        view.set_connected(false, "http://dash");
        assert!(view.section(Section::Connection).unwrap().contains("Connection Error"));
        view.set_connected(true, "http://dash");
        assert_eq!(view.section(Section::Connection), Some(""));
    }

    #[test]
    fn snapshot_serializes_section_ids() {
        let mut view = DashboardView::new("week");
        view.apply_system_status(&[]);
        let json = serde_json::to_value(view.snapshot()).unwrap();
        assert_eq!(json["timeframe"], "week");
        assert!(json["sections"]["system-status"].is_string());
        assert!(json["charts"]["api-calls"].is_object());
        assert!(json["connected"].is_null());
    }

    #[test]
    fn delete_feedback_outcomes() {
        let ok = delete_feedback(&Ok(serde_json::json!({"deleted": true})));
        assert!(ok.close_detail && ok.refresh);
        assert_eq!(ok.alert, AlertKind::Success);

        let missing = delete_feedback(&Err(ApiError::NotFound));
        assert_eq!(missing.message, "Failed to delete detection: Detection not found");
        assert!(!missing.close_detail);
        assert!(!missing.refresh);

        let failed = delete_feedback(&Err(ApiError::Status {
            code: 500,
            message: "Database locked".into(),
        }));
        assert_eq!(failed.message, "Failed to delete detection: Database locked");
        assert!(!failed.close_detail && !failed.refresh);
    }

    #[test]
    fn upload_feedback_marks_local_rejections() {
        let rejected = upload_feedback(&Err(ApiError::Validation(
            "File size must be less than 10MB.".into(),
        )));
        assert!(!rejected.ok);
        assert!(rejected.rejected_locally);
        assert!(rejected.html.contains("File size must be less than 10MB."));

        let app = upload_feedback(&Err(ApiError::Application("Model not loaded".into())));
        assert!(!app.rejected_locally);
        assert!(app.html.contains("Model not loaded"));
    }
}
