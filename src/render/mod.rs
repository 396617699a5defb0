//! HTML fragment renderers.
//!
//! Each function maps a payload to the complete markup of one dashboard
//! section; a refresh replaces the section wholesale. All interpolated text
//! goes through [`escape_html`].

pub mod charts;
pub mod detections;

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::format::{format_number, format_thousands, time_ago};
use crate::model::{ErrorLogEntry, LogLevel, MetricsSnapshot, Numeric, Performance, ServiceStatus};

pub use charts::{ChartKind, ChartName, ChartRegistry, ChartState};
pub use detections::{
    detail_fallback, detail_panel, detection_cards, upload_error, upload_result,
};

/// Placeholder for a value the service did not send.
pub const MISSING: &str = "N/A";

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escaped display text of an optional numeric, with a unit suffix.
fn numeric_text(value: Option<&Numeric>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{}{suffix}", escape_html(&v.to_string())),
        None => MISSING.to_string(),
    }
}

fn tile(metric: &str, element_id: &str, label: &str, value: &str) -> String {
    format!(
        r#"<div class="metric-tile" data-metric="{metric}"><div class="metric-label">{label}</div><div class="metric-value" id="{element_id}">{value}</div></div>"#
    )
}

// ---------------------------------------------------------------------------
// Metrics and analytics
// ---------------------------------------------------------------------------

/// The four headline tiles.
pub fn metric_tiles(metrics: &MetricsSnapshot) -> String {
    let api_calls = match metrics.api_calls.as_ref() {
        Some(Numeric::Number(n)) => format_thousands(*n),
        Some(other) => escape_html(&other.to_string()),
        None => MISSING.to_string(),
    };

    [
        tile(
            "activeSessions",
            "activeSessionsCount",
            "Active Sessions",
            &numeric_text(metrics.active_sessions.as_ref(), ""),
        ),
        tile("apiCalls", "apiCallsCount", "API Calls", &api_calls),
        tile(
            "responseTime",
            "avgResponseTime",
            "Avg Response Time",
            &numeric_text(metrics.response_time.as_ref(), "ms"),
        ),
        tile(
            "errorRate",
            "errorRatePercent",
            "Error Rate",
            &numeric_text(metrics.error_rate.as_ref(), "%"),
        ),
    ]
    .join("\n")
}

/// Performance tiles of the analytics tab.
pub fn analytics_tiles(performance: &Performance) -> String {
    [
        tile(
            "avgConfidence",
            "avgConfidence",
            "Avg Confidence",
            &numeric_text(performance.avg_confidence.as_ref(), "%"),
        ),
        tile(
            "successRate",
            "successRate",
            "Success Rate",
            &numeric_text(performance.success_rate.as_ref(), "%"),
        ),
        tile(
            "avgObjectsPerFrame",
            "avgObjectsPerFrame",
            "Avg Objects / Frame",
            &numeric_text(performance.avg_objects_per_frame.as_ref(), ""),
        ),
        tile(
            "uniqueUsers",
            "uniqueUsers",
            "Unique Users",
            &numeric_text(performance.unique_users.as_ref(), ""),
        ),
    ]
    .join("\n")
}

// ---------------------------------------------------------------------------
// System status
// ---------------------------------------------------------------------------

fn status_badge_class(status_class: &str) -> &'static str {
    match status_class {
        "success" => "bg-success",
        "warning" => "bg-warning",
        _ => "bg-danger",
    }
}

/// Rows of the system status table.
pub fn status_table(services: &[ServiceStatus]) -> String {
    let mut html = String::new();
    for service in services {
        let load = format_number(service.load);
        let bar_class = if service.status_class == "warning" {
            " bg-warning"
        } else {
            ""
        };
        let _ = write!(
            html,
            r#"<tr>
  <td>{name}</td>
  <td><span class="badge {badge}">{status}</span></td>
  <td><div class="progress"><div class="progress-bar{bar_class}" role="progressbar" style="width: {load}%" aria-valuenow="{load}" aria-valuemin="0" aria-valuemax="100">{load}%</div></div></td>
  <td>{uptime}</td>
  <td>{last_update}</td>
</tr>
"#,
            name = escape_html(&service.service),
            badge = status_badge_class(&service.status_class),
            status = escape_html(&service.status),
            uptime = escape_html(&service.uptime),
            last_update = escape_html(&service.last_update),
        );
    }
    html
}

// ---------------------------------------------------------------------------
// Error logs
// ---------------------------------------------------------------------------

/// The error log list, newest first as the service sends it.
pub fn error_logs(entries: &[ErrorLogEntry], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return r#"<div class="text-center text-muted"><p>No error logs available.</p></div>"#
            .to_string();
    }

    let mut html = String::new();
    for entry in entries {
        let (level_class, badge_class) = match entry.level {
            LogLevel::Error => ("error-log", "bg-danger"),
            LogLevel::Warn => ("warning-log", "bg-warning text-dark"),
            LogLevel::Info(_) => ("info-log", "bg-info"),
        };
        let _ = write!(
            html,
            r#"<div class="{level_class}">
  <div class="log-head"><span class="badge {badge_class}">{level}</span><span class="small text-muted">{ago}</span></div>
  <h6>{kind}</h6>
  <p class="mb-1">{message}</p>
</div>
"#,
            level = escape_html(entry.level.as_str()),
            ago = time_ago(entry.timestamp.as_deref(), now),
            kind = escape_html(entry.kind.as_deref().unwrap_or("System Error")),
            message = escape_html(&entry.message),
        );
    }
    html
}

// ---------------------------------------------------------------------------
// Banners
// ---------------------------------------------------------------------------

/// Warning shown when the dashboard service did not answer the probe.
pub fn connection_banner(dashboard_base: &str) -> String {
    format!(
        r#"<div class="alert alert-warning"><strong>Connection Error:</strong> Cannot connect to the dashboard service at {}. Make sure it is running.</div>"#,
        escape_html(dashboard_base)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn metric_tiles_format_each_value() {
        let metrics: MetricsSnapshot = serde_json::from_str(
            r#"{"activeSessions":12,"apiCalls":3456,"responseTime":420,"errorRate":"1.2"}"#,
        )
        .unwrap();
        let html = metric_tiles(&metrics);
        assert!(html.contains(r#"id="activeSessionsCount">12<"#));
        assert!(html.contains(r#"id="apiCallsCount">3,456<"#));
        assert!(html.contains(r#"id="avgResponseTime">420ms<"#));
        assert!(html.contains(r#"id="errorRatePercent">1.2%<"#));
    }

    #[test]
    fn missing_metrics_render_placeholder() {
        let html = metric_tiles(&MetricsSnapshot::default());
        assert_eq!(html.matches(MISSING).count(), 4);
    }

    #[test]
    fn analytics_tiles_show_percentages() {
        let perf: Performance = serde_json::from_str(
            r#"{"avgConfidence":87.5,"successRate":99,"avgObjectsPerFrame":2.3,"uniqueUsers":41}"#,
        )
        .unwrap();
        let html = analytics_tiles(&perf);
        assert!(html.contains(">87.5%<"));
        assert!(html.contains(">99%<"));
        assert!(html.contains(">2.3<"));
        assert!(html.contains(">41<"));
    }

    #[test]
    fn status_table_maps_classes() {
        let rows: Vec<ServiceStatus> = serde_json::from_str(
            r#"[
                {"service":"API","status":"Online","statusClass":"success","load":42,"uptime":"99.9%","lastUpdate":"now"},
                {"service":"Model","status":"Degraded","statusClass":"warning","load":85.5,"uptime":"97%","lastUpdate":"1m"},
                {"service":"DB","status":"Down","statusClass":"critical","load":0,"uptime":"0%","lastUpdate":"5m"}
            ]"#,
        )
        .unwrap();
        let html = status_table(&rows);
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains(r#"<span class="badge bg-success">Online</span>"#));
        assert!(html.contains(r#"progress-bar bg-warning" role="progressbar" style="width: 85.5%""#));
        assert!(html.contains(r#"<span class="badge bg-danger">Down</span>"#));
    }

    #[test]
    fn error_logs_empty_and_levels() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(error_logs(&[], now).contains("No error logs available."));

        let entries: Vec<ErrorLogEntry> = serde_json::from_str(
            r#"[
                {"level":"ERROR","type":"Timeout","message":"<boom>","timestamp":"2024-01-01T10:00:00Z"},
                {"level":"WARN","message":"slow"},
                {"level":"DEBUG","message":"noise"}
            ]"#,
        )
        .unwrap();
        let html = error_logs(&entries, now);
        assert!(html.contains(r#"<div class="error-log">"#));
        assert!(html.contains("2 hours ago"));
        assert!(html.contains("&lt;boom&gt;"));
        assert!(html.contains(r#"<div class="warning-log">"#));
        assert!(html.contains("<h6>System Error</h6>"));
        assert!(html.contains(r#"<span class="badge bg-info">DEBUG</span>"#));
    }

    #[test]
    fn banner_escapes_url() {
        let html = connection_banner("http://x/<y>");
        assert!(html.contains("http://x/&lt;y&gt;"));
    }
}
