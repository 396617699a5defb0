//! Display formatting for dashboard values.
//!
//! Pure functions only: time-ago buckets, timestamp rendering, truncation,
//! confidence tiers, number grouping, and the client-side detection id.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::model::DetectedObject;

/// Shown wherever a timestamp is absent or cannot be read.
pub const UNKNOWN_TIME: &str = "Unknown time";

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parse the timestamp shapes the services emit.
///
/// RFC 3339 values carry their own offset. Zone-less date-times are read as
/// local time, and bare dates as UTC midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Bucket the time elapsed since `timestamp` relative to `now`.
///
/// Future timestamps count as "Just now".
pub fn time_ago(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(past) = timestamp.and_then(parse_timestamp) else {
        return UNKNOWN_TIME.to_string();
    };

    let elapsed = now - past;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} mins ago")
    } else if hours < 24 {
        format!("{hours} hours ago")
    } else {
        format!("{days} days ago")
    }
}

/// Render `YYYY-MM-DD HH:MM:SS` in local time.
///
/// Unparseable input comes back unchanged.
pub fn format_timestamp(timestamp: Option<&str>) -> String {
    format_timestamp_in(timestamp, &Local)
}

/// [`format_timestamp`] for an explicit zone.
pub fn format_timestamp_in<Tz>(timestamp: Option<&str>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let Some(raw) = timestamp.filter(|s| !s.trim().is_empty()) else {
        return UNKNOWN_TIME.to_string();
    };

    match parse_timestamp(raw) {
        Some(dt) => dt.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Shorten `text` to `max_len` characters, ending in `...` when cut.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Format a number the way the dashboard shows counters: integers without a
/// fractional part, everything else with its shortest representation.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Group the integer part with comma separators: `3456` → `3,456`.
///
/// Fractions are kept to at most three digits.
pub fn format_thousands(n: f64) -> String {
    if !n.is_finite() {
        return format!("{n}");
    }

    let fixed = format!("{:.3}", n.abs());
    let (digits, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');
    let negative = n < 0.0 && (digits != "0" || !fraction.is_empty());

    let mut grouped = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let mut result: String = grouped.chars().rev().collect();

    if !fraction.is_empty() {
        result.push('.');
        result.push_str(fraction);
    }

    if negative {
        format!("-{result}")
    } else {
        result
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Severity tier for a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTier {
    Success,
    Warning,
    Danger,
}

impl BadgeTier {
    /// CSS classes for the badge.
    pub fn css_class(self) -> &'static str {
        match self {
            BadgeTier::Success => "bg-success",
            BadgeTier::Warning => "bg-warning text-dark",
            BadgeTier::Danger => "bg-danger",
        }
    }

    /// Icon shown next to an object in the detail panel.
    pub fn icon(self) -> &'static str {
        match self {
            BadgeTier::Success => "fas fa-check-circle",
            BadgeTier::Warning => "fas fa-exclamation-triangle",
            BadgeTier::Danger => "fas fa-times-circle",
        }
    }
}

/// Confidence as a whole percentage, rounded to nearest.
pub fn confidence_percent(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

/// Map a `[0, 1]` score to its tier: ≥80% success, ≥60% warning, else danger.
pub fn confidence_badge(confidence: f64) -> BadgeTier {
    match confidence_percent(confidence) {
        p if p >= 80 => BadgeTier::Success,
        p if p >= 60 => BadgeTier::Warning,
        _ => BadgeTier::Danger,
    }
}

// ---------------------------------------------------------------------------
// Detection identity and statistics
// ---------------------------------------------------------------------------

/// Display-only surrogate key for a detection the server sent without an id.
///
/// Folds `timestamp + device + object_count` over UTF-16 code units with
/// `acc = acc * 31 + unit` in wrapping 32-bit arithmetic. Not collision-free.
pub fn client_detection_id(
    timestamp: Option<&str>,
    device: Option<&str>,
    object_count: usize,
) -> String {
    let combined = format!(
        "{}{}{}",
        timestamp.unwrap_or(""),
        device.unwrap_or("unknown"),
        object_count
    );

    let hash = combined
        .encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));

    format!("det_{}", i64::from(hash).abs())
}

/// Aggregates shown in the detail panel's statistics block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailStats {
    pub total: usize,
    /// Rounded average confidence percent; `None` when there are no objects.
    pub avg_confidence: Option<i64>,
    /// Objects with confidence ≥ 0.8.
    pub high_confidence: usize,
}

pub fn detail_stats(objects: &[DetectedObject]) -> DetailStats {
    if objects.is_empty() {
        return DetailStats {
            total: 0,
            avg_confidence: None,
            high_confidence: 0,
        };
    }

    let sum: f64 = objects.iter().map(|o| o.confidence).sum();
    DetailStats {
        total: objects.len(),
        avg_confidence: Some(confidence_percent(sum / objects.len() as f64)),
        high_confidence: objects.iter().filter(|o| o.confidence >= 0.8).count(),
    }
}

/// Objects ordered by descending confidence; ties keep their original order.
pub fn by_confidence(objects: &[DetectedObject]) -> Vec<&DetectedObject> {
    let mut sorted: Vec<&DetectedObject> = objects.iter().collect();
    sorted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    sorted
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Guess an image MIME type from a file name's extension.
pub fn guess_image_mime(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
