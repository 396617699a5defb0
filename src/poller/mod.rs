//! Refresh orchestration.
//!
//! A cycle is a set of independent fetches run concurrently on scoped
//! threads. Each fetch takes a token from the [`Sequencer`] for its slot
//! before it starts; when it completes, the result is applied to the view
//! only if no newer fetch for the same slot has been issued since. A failed
//! fetch is logged and its section keeps its previous content.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;

use crate::api::{ApiResult, DashboardApi};
use crate::config::DetwatchConfig;
use crate::view::{self, DashboardView, SharedView};

/// Delay between a successful upload and the metrics/recent refresh.
pub const UPLOAD_REFRESH_DELAY: Duration = Duration::from_millis(1000);

/// Delay between a successful delete and the recent refresh.
pub const DELETE_REFRESH_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Sequencing
// ---------------------------------------------------------------------------

/// One independently sequenced fetch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Metrics,
    ApiCallsChart,
    Categories,
    HourlyUsage,
    ResponseTime,
    Analytics,
    SystemStatus,
    RecentDetections,
    ErrorLogs,
    Probe,
}

impl Slot {
    const COUNT: usize = 10;

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Metrics => "metrics",
            Slot::ApiCallsChart => "api-calls chart",
            Slot::Categories => "detection categories",
            Slot::HourlyUsage => "hourly usage chart",
            Slot::ResponseTime => "response time chart",
            Slot::Analytics => "analytics",
            Slot::SystemStatus => "system status",
            Slot::RecentDetections => "recent detections",
            Slot::ErrorLogs => "error logs",
            Slot::Probe => "connection probe",
        }
    }
}

/// Ticket for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    slot: Slot,
    value: u64,
}

impl Token {
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

/// Per-slot monotonically increasing counters.
#[derive(Debug, Default)]
pub struct Sequencer {
    latest: [AtomicU64; Slot::COUNT],
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token that supersedes every earlier token for `slot`.
    pub fn issue(&self, slot: Slot) -> Token {
        let value = self.latest[slot.index()].fetch_add(1, Ordering::SeqCst) + 1;
        Token { slot, value }
    }

    /// Whether `token` is still the newest issued for its slot.
    pub fn is_current(&self, token: Token) -> bool {
        self.latest[token.slot.index()].load(Ordering::SeqCst) == token.value
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// A single fetch and the view update it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Metrics,
    ApiCallsChart(String),
    Categories,
    HourlyUsage(String),
    ResponseTime(String),
    Analytics(String),
    SystemStatus,
    RecentDetections,
    ErrorLogs,
    Probe,
}

impl Job {
    pub fn slot(&self) -> Slot {
        match self {
            Job::Metrics => Slot::Metrics,
            Job::ApiCallsChart(_) => Slot::ApiCallsChart,
            Job::Categories => Slot::Categories,
            Job::HourlyUsage(_) => Slot::HourlyUsage,
            Job::ResponseTime(_) => Slot::ResponseTime,
            Job::Analytics(_) => Slot::Analytics,
            Job::SystemStatus => Slot::SystemStatus,
            Job::RecentDetections => Slot::RecentDetections,
            Job::ErrorLogs => Slot::ErrorLogs,
            Job::Probe => Slot::Probe,
        }
    }
}

/// Timeframes are opaque to the client but must be a plain token.
pub fn is_valid_timeframe(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= 32
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Drives every refresh of a [`DashboardView`].
pub struct Poller<A: DashboardApi + 'static> {
    api: Arc<A>,
    view: SharedView,
    sequencer: Arc<Sequencer>,
    stopped: Arc<AtomicBool>,
    interval: Duration,
    recent_limit: u32,
    error_log_limit: u32,
    dashboard_base: String,
}

impl<A: DashboardApi + 'static> Clone for Poller<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            view: Arc::clone(&self.view),
            sequencer: Arc::clone(&self.sequencer),
            stopped: Arc::clone(&self.stopped),
            interval: self.interval,
            recent_limit: self.recent_limit,
            error_log_limit: self.error_log_limit,
            dashboard_base: self.dashboard_base.clone(),
        }
    }
}

impl<A: DashboardApi + 'static> Poller<A> {
    pub fn new(api: Arc<A>, view: SharedView, config: &DetwatchConfig) -> Self {
        Self {
            api,
            view,
            sequencer: Arc::new(Sequencer::new()),
            stopped: Arc::new(AtomicBool::new(false)),
            interval: Duration::from_secs(config.polling.interval_secs.max(1)),
            recent_limit: config.polling.recent_limit,
            error_log_limit: config.polling.error_log_limit,
            dashboard_base: config.services.dashboard_url.clone(),
        }
    }

    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Everything the page shows, plus the connectivity probe.
    pub fn initial_load(&self) {
        let (timeframe, chart_timeframe) = {
            let view = view::lock(&self.view);
            (view.timeframe().to_string(), view.chart_timeframe().to_string())
        };
        self.run_cycle(vec![
            Job::Metrics,
            Job::ApiCallsChart(chart_timeframe),
            Job::Categories,
            Job::HourlyUsage(timeframe.clone()),
            Job::ResponseTime(timeframe.clone()),
            Job::Analytics(timeframe),
            Job::SystemStatus,
            Job::RecentDetections,
            Job::ErrorLogs,
            Job::Probe,
        ]);
    }

    /// The periodic cycle.
    pub fn refresh(&self) {
        self.run_cycle(vec![Job::Metrics, Job::SystemStatus, Job::RecentDetections]);
    }

    /// Switch the analytics tab to `timeframe` and reload its charts.
    pub fn switch_timeframe(&self, timeframe: &str) {
        view::lock(&self.view).set_timeframe(timeframe);
        self.run_cycle(vec![
            Job::HourlyUsage(timeframe.to_string()),
            Job::ResponseTime(timeframe.to_string()),
            Job::Analytics(timeframe.to_string()),
        ]);
    }

    /// Switch the dashboard's API-calls chart to `timeframe`.
    pub fn switch_chart_timeframe(&self, timeframe: &str) {
        view::lock(&self.view).set_chart_timeframe(timeframe);
        self.run_cycle(vec![Job::ApiCallsChart(timeframe.to_string())]);
    }

    /// Refresh metrics and recent detections shortly after an upload.
    pub fn after_upload(&self) -> JoinHandle<()> {
        self.delayed(
            UPLOAD_REFRESH_DELAY,
            vec![Job::Metrics, Job::RecentDetections],
        )
    }

    /// Refresh recent detections shortly after a delete.
    pub fn after_delete(&self) -> JoinHandle<()> {
        self.delayed(DELETE_REFRESH_DELAY, vec![Job::RecentDetections])
    }

    fn delayed(&self, delay: Duration, jobs: Vec<Job>) -> JoinHandle<()> {
        let poller = self.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            poller.run_cycle(jobs);
        })
    }

    /// Start polling on a background thread: the initial load, then a
    /// refresh every interval until [`Poller::stop`].
    pub fn spawn(&self) -> JoinHandle<()> {
        let poller = self.clone();
        thread::spawn(move || {
            poller.initial_load();
            log::info!(
                "polling every {}s",
                poller.interval.as_secs()
            );
            loop {
                thread::sleep(poller.interval);
                if poller.stopped.load(Ordering::SeqCst) {
                    break;
                }
                poller.refresh();
            }
        })
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Run `jobs` concurrently and wait for all of them.
    pub fn run_cycle(&self, jobs: Vec<Job>) {
        thread::scope(|scope| {
            for job in jobs {
                let token = self.sequencer.issue(job.slot());
                scope.spawn(move || self.run_job(job, token));
            }
        });
    }

    fn run_job(&self, job: Job, token: Token) {
        let api = self.api.as_ref();
        match job {
            Job::Metrics => self.apply(token, api.metrics(), |view, metrics| {
                view.apply_metrics(&metrics)
            }),
            Job::ApiCallsChart(tf) => self.apply(token, api.chart_data(&tf), |view, series| {
                view.apply_api_calls_chart(&series)
            }),
            Job::Categories => self.apply(token, api.detection_categories(), |view, series| {
                view.apply_categories(&series)
            }),
            Job::HourlyUsage(tf) => self.apply(token, api.chart_data(&tf), |view, series| {
                view.apply_hourly_usage(&series)
            }),
            Job::ResponseTime(tf) => {
                self.apply(token, api.response_time_data(&tf), |view, series| {
                    view.apply_response_time(&series)
                })
            }
            Job::Analytics(tf) => self.apply(token, api.analytics(&tf), |view, analytics| {
                view.apply_analytics(&analytics)
            }),
            Job::SystemStatus => self.apply(token, api.system_status(), |view, services| {
                view.apply_system_status(&services)
            }),
            Job::RecentDetections => {
                self.apply(token, api.recent_detections(self.recent_limit), |view, list| {
                    view.apply_recent_detections(&list, Utc::now())
                })
            }
            Job::ErrorLogs => self.apply(token, api.error_logs(self.error_log_limit), |view, logs| {
                view.apply_error_logs(&logs, Utc::now())
            }),
            Job::Probe => {
                let connected = api.probe();
                if !connected {
                    log::warn!("cannot reach the dashboard service at {}", self.dashboard_base);
                }
                self.apply(token, Ok(connected), |view, connected| {
                    view.set_connected(connected, &self.dashboard_base)
                });
            }
        }
    }

    /// Apply a fetch result if its token is still current.
    fn apply<T>(&self, token: Token, result: ApiResult<T>, update: impl FnOnce(&mut DashboardView, T)) {
        match result {
            Ok(value) => {
                let mut view = view::lock(&self.view);
                if self.sequencer.is_current(token) {
                    update(&mut view, value);
                } else {
                    log::debug!("dropping superseded {} response", token.slot.as_str());
                }
            }
            Err(e) => log::warn!("failed to load {}: {e}", token.slot.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::model::{
        Analytics, ChartSeries, Detection, ErrorLogEntry, MetricsSnapshot, ServiceStatus,
    };
    use crate::render::ChartName;
    use crate::view::Section;
    use std::sync::Mutex;

    /// Scripted fake: records calls, fails what it is told to fail.
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        fail_metrics: bool,
        reachable: bool,
    }

    impl FakeApi {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort();
            calls
        }

        fn series(label: &str) -> ChartSeries {
            ChartSeries::new(vec![label.to_string()], vec![1.0]).unwrap()
        }
    }

    impl DashboardApi for FakeApi {
        fn metrics(&self) -> ApiResult<MetricsSnapshot> {
            self.record("metrics".into());
            if self.fail_metrics {
                return Err(ApiError::Status {
                    code: 500,
                    message: "HTTP 500: Internal Server Error".into(),
                });
            }
            Ok(serde_json::from_str(r#"{"activeSessions":7}"#).unwrap())
        }
        fn chart_data(&self, timeframe: &str) -> ApiResult<ChartSeries> {
            self.record(format!("chart-data:{timeframe}"));
            Ok(Self::series(timeframe))
        }
        fn detection_categories(&self) -> ApiResult<ChartSeries> {
            self.record("categories".into());
            Ok(Self::series("person"))
        }
        fn analytics(&self, timeframe: &str) -> ApiResult<Analytics> {
            self.record(format!("analytics:{timeframe}"));
            Ok(Analytics::default())
        }
        fn response_time_data(&self, timeframe: &str) -> ApiResult<ChartSeries> {
            self.record(format!("response-time:{timeframe}"));
            Ok(Self::series(timeframe))
        }
        fn system_status(&self) -> ApiResult<Vec<ServiceStatus>> {
            self.record("system-status".into());
            Ok(Vec::new())
        }
        fn recent_detections(&self, limit: u32) -> ApiResult<Vec<Detection>> {
            self.record(format!("recent:{limit}"));
            Ok(serde_json::from_str(r#"[{"id":"r1"}]"#).unwrap())
        }
        fn error_logs(&self, limit: u32) -> ApiResult<Vec<ErrorLogEntry>> {
            self.record(format!("error-logs:{limit}"));
            Ok(Vec::new())
        }
        fn probe(&self) -> bool {
            self.record("probe".into());
            self.reachable
        }
    }

    fn poller(api: FakeApi) -> Poller<FakeApi> {
        let config = DetwatchConfig::default();
        let view = view::shared(DashboardView::new(&config.polling.default_timeframe));
        Poller::new(Arc::new(api), view, &config)
    }

    #[test]
    fn sequencer_supersedes_older_tokens() {
        let seq = Sequencer::new();
        let first = seq.issue(Slot::Metrics);
        let second = seq.issue(Slot::Metrics);
        let other = seq.issue(Slot::ErrorLogs);
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
        assert!(seq.is_current(other));
    }

    #[test]
    fn stale_result_is_dropped() {
        let p = poller(FakeApi::default());
        let old = p.sequencer().issue(Slot::Metrics);
        let _new = p.sequencer().issue(Slot::Metrics);
        p.apply(old, Ok(MetricsSnapshot::default()), |view, m| view.apply_metrics(&m));
        assert!(view::lock(p.view()).section(Section::Metrics).is_none());
    }

    #[test]
    fn initial_load_fetches_everything() {
        let p = poller(FakeApi {
            reachable: true,
            ..FakeApi::default()
        });
        p.initial_load();

        assert_eq!(
            p.api.calls(),
            vec![
                "analytics:day",
                "categories",
                "chart-data:day",
                "chart-data:day",
                "error-logs:20",
                "metrics",
                "probe",
                "recent:8",
                "response-time:day",
                "system-status",
            ]
        );

        let view = view::lock(p.view());
        assert!(view.section(Section::Metrics).unwrap().contains(">7<"));
        assert!(view.lookup("r1").is_some());
        assert_eq!(view.connected(), Some(true));
        assert_eq!(
            view.charts().get(ChartName::TopCategories).unwrap().labels,
            vec!["person"]
        );
    }

    #[test]
    fn failed_section_does_not_block_others() {
        let p = poller(FakeApi {
            fail_metrics: true,
            ..FakeApi::default()
        });
        p.initial_load();

        let view = view::lock(p.view());
        assert!(view.section(Section::Metrics).is_none());
        assert!(view.section(Section::SystemStatus).is_some());
        assert!(view.section(Section::Connection).unwrap().contains("Connection Error"));
    }

    #[test]
    fn interval_refresh_is_narrow() {
        let p = poller(FakeApi::default());
        p.refresh();
        assert_eq!(p.api.calls(), vec!["metrics", "recent:8", "system-status"]);
    }

    #[test]
    fn timeframe_switch_reloads_analytics_only() {
        let p = poller(FakeApi::default());
        p.switch_timeframe("week");
        assert_eq!(
            p.api.calls(),
            vec!["analytics:week", "chart-data:week", "response-time:week"]
        );
        let view = view::lock(p.view());
        assert_eq!(view.timeframe(), "week");
        assert_eq!(view.chart_timeframe(), "day");
        assert_eq!(
            view.charts().get(ChartName::HourlyUsage).unwrap().labels,
            vec!["week"]
        );
        assert!(view.charts().get(ChartName::ApiCalls).unwrap().labels.is_empty());
    }

    #[test]
    fn chart_timeframe_switch_updates_api_calls() {
        let p = poller(FakeApi::default());
        p.switch_chart_timeframe("month");
        let view = view::lock(p.view());
        assert_eq!(view.chart_timeframe(), "month");
        assert_eq!(
            view.charts().get(ChartName::ApiCalls).unwrap().labels,
            vec!["month"]
        );
    }

    #[test]
    fn delete_refresh_fetches_recent_only() {
        let p = poller(FakeApi::default());
        p.after_delete().join().unwrap();
        assert_eq!(p.api.calls(), vec!["recent:8"]);
    }

    #[test]
    fn upload_refresh_fetches_metrics_and_recent() {
        let p = poller(FakeApi::default());
        p.after_upload().join().unwrap();
        assert_eq!(p.api.calls(), vec!["metrics", "recent:8"]);
    }

    #[test]
    fn timeframe_tokens() {
        assert!(is_valid_timeframe("day"));
        assert!(is_valid_timeframe("last_7-days"));
        assert!(!is_valid_timeframe(""));
        assert!(!is_valid_timeframe("day&x=1"));
    }
}
