//! Detection cards, the detail panel, and upload results.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::{MISSING, escape_html};
use crate::format::{
    by_confidence, confidence_badge, confidence_percent, detail_stats, format_timestamp,
    time_ago, truncate,
};
use crate::model::{DetectedObject, Detection, DetectionOutcome, Numeric};

/// Inline object badges shown on a card before collapsing into `+N more`.
const CARD_BADGES: usize = 3;

/// File names in the detail panel are cut to this many characters.
const DETAIL_FILE_NAME_LEN: usize = 20;

fn device_text(detection: &Detection) -> &str {
    detection.device.as_deref().unwrap_or("Unknown Device")
}

fn file_name_text(detection: &Detection) -> &str {
    detection.file_name.as_deref().unwrap_or("Unknown file")
}

fn millis(value: Option<&Numeric>) -> String {
    match value {
        Some(v) => format!("{}ms", escape_html(&v.to_string())),
        None => MISSING.to_string(),
    }
}

fn object_label(object: &DetectedObject, fallback: &str) -> String {
    escape_html(object.label.as_deref().unwrap_or(fallback))
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

fn card_badges(objects: &[DetectedObject]) -> String {
    if objects.is_empty() {
        return r#"<span class="badge bg-secondary">No objects detected</span>"#.to_string();
    }

    let mut html = String::new();
    for object in objects.iter().take(CARD_BADGES) {
        let _ = write!(
            html,
            r#"<span class="badge {} me-1 mb-1">{} {}%</span>"#,
            confidence_badge(object.confidence).css_class(),
            object_label(object, "Unknown"),
            confidence_percent(object.confidence),
        );
    }
    if objects.len() > CARD_BADGES {
        let _ = write!(
            html,
            r#"<span class="badge bg-info mb-1">+{} more</span>"#,
            objects.len() - CARD_BADGES
        );
    }
    html
}

fn card_image(image_url: Option<&str>) -> String {
    let placeholder = r#"<div class="detection-placeholder"><i class="fas fa-image"></i></div>"#;
    match image_url.filter(|u| !u.is_empty()) {
        Some(url) => format!(
            r#"<div class="detection-image-container"><img src="{}" alt="Detection Result" class="detection-thumbnail"></div>"#,
            escape_html(url)
        ),
        None => placeholder.to_string(),
    }
}

/// One card per detection, in the order the service returned them.
pub fn detection_cards(detections: &[Detection], now: DateTime<Utc>) -> String {
    let mut html = String::new();
    for detection in detections {
        let _ = write!(
            html,
            r#"<div class="detection-card" data-detection-key="{key}">
  {image}
  <span class="badge badge-status bg-primary">{count} objects</span>
  <div class="card-meta"><small class="text-muted">{ago}</small><small class="text-muted">{processing}</small></div>
  <div class="card-badges">{badges}</div>
  <div class="text-truncate"><small class="text-muted">{file_name}</small></div>
  <div class="card-foot"><small class="text-muted">{device}</small><button class="btn-details" data-detection-key="{key}" title="View Details">Details</button></div>
</div>
"#,
            key = escape_html(&detection.key()),
            image = card_image(detection.image_url.as_deref()),
            count = detection.objects.len(),
            ago = time_ago(detection.timestamp.as_deref(), now),
            processing = millis(detection.processing_time.as_ref()),
            badges = card_badges(&detection.objects),
            file_name = escape_html(file_name_text(detection)),
            device = escape_html(device_text(detection)),
        );
    }
    html
}

// ---------------------------------------------------------------------------
// Detail panel
// ---------------------------------------------------------------------------

fn info_row(label: &str, value: &str) -> String {
    format!(
        r#"<li class="list-group-item"><span>{label}</span><span class="text-secondary">{value}</span></li>"#
    )
}

fn detail_objects(objects: &[DetectedObject]) -> String {
    if objects.is_empty() {
        return r#"<li class="list-group-item text-center text-muted"><div>No objects detected in this image</div><small>Try uploading a different image with more visible objects</small></li>"#
            .to_string();
    }

    let mut html = String::new();
    for (index, object) in by_confidence(objects).into_iter().enumerate() {
        let tier = confidence_badge(object.confidence);
        let position = object
            .bounds
            .map(|rect| {
                format!(
                    r#"<small class="text-muted d-block">Position: ({}, {}) • Size: {}×{}px</small>"#,
                    rect.x.round(),
                    rect.y.round(),
                    rect.width.round(),
                    rect.height.round()
                )
            })
            .unwrap_or_default();
        let _ = write!(
            html,
            r#"<li class="list-group-item"><i class="{icon}"></i> <span class="fw-bold">{label}</span> <span class="text-muted">#{n}</span> <span class="badge {class}">{pct}%</span>{position}</li>"#,
            icon = tier.icon(),
            label = object_label(object, "Unknown Object"),
            n = index + 1,
            class = tier.css_class(),
            pct = confidence_percent(object.confidence),
        );
    }
    html
}

/// Full detail panel for one detection.
pub fn detail_panel(detection: &Detection) -> String {
    let key = escape_html(&detection.key());
    let file_name = file_name_text(detection);
    let object_count = detection.objects.len();
    let (status, status_class) = if object_count > 0 {
        ("Success", "bg-success")
    } else {
        ("No Objects Detected", "bg-warning text-dark")
    };

    let info = [
        info_row(
            "Detection ID",
            &format!(r#"<span class="font-monospace">{key}</span>"#),
        ),
        info_row(
            "Timestamp",
            &escape_html(&format_timestamp(detection.timestamp.as_deref())),
        ),
        info_row("Device", &escape_html(device_text(detection))),
        info_row(
            "Processing Time",
            &millis(detection.processing_time.as_ref()),
        ),
        info_row(
            "File Name",
            &format!(
                r#"<span title="{}">{}</span>"#,
                escape_html(file_name),
                escape_html(&truncate(file_name, DETAIL_FILE_NAME_LEN))
            ),
        ),
        info_row(
            "Objects Found",
            &format!(r#"<span class="badge bg-primary">{object_count}</span>"#),
        ),
        info_row(
            "Detection Status",
            &format!(r#"<span class="badge {status_class}">{status}</span>"#),
        ),
    ]
    .join("\n");

    let stats = detail_stats(&detection.objects);
    let average = stats
        .avg_confidence
        .map(|pct| format!("{pct}%"))
        .unwrap_or_else(|| MISSING.to_string());

    let image = detection
        .image_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .map(|u| format!(r#"<img src="{}" alt="Detection" class="detail-image">"#, escape_html(u)))
        .unwrap_or_default();

    format!(
        r#"<div class="detail-panel" data-detection-key="{key}">
{image}
<ul class="list-group detail-info">
{info}
</ul>
<div class="detail-stats">
  <div><span id="modalTotalObjects">{total}</span> objects</div>
  <div><span id="modalAvgConfidence">{average}</span> avg confidence</div>
  <div><span id="modalHighConfidence">{high}</span> high confidence</div>
</div>
<ul class="list-group detail-objects">
{objects}
</ul>
<button class="btn-delete" data-detection-id="{key}">Delete</button>
</div>"#,
        total = stats.total,
        high = stats.high_confidence,
        objects = detail_objects(&detection.objects),
    )
}

/// Panel shown when a key no longer matches any known detection.
pub fn detail_fallback() -> String {
    r#"<div class="detail-panel">
<ul class="list-group detail-info">
<li class="list-group-item">Status <span class="badge bg-warning text-dark">Data Unavailable</span></li>
</ul>
<ul class="list-group detail-objects">
<li class="list-group-item text-center text-muted">Detection data could not be loaded</li>
</ul>
</div>"#
        .to_string()
}

// ---------------------------------------------------------------------------
// Upload results
// ---------------------------------------------------------------------------

/// Summary and object list for a completed upload.
pub fn upload_result(outcome: &DetectionOutcome) -> String {
    let image = outcome
        .image_url
        .as_deref()
        .map(|u| (u, "Processed Image"))
        .or_else(|| outcome.original_image_url.as_deref().map(|u| (u, "Original Image")))
        .map(|(u, alt)| {
            format!(
                r#"<img src="{}" alt="{alt}" class="img-fluid result-image">"#,
                escape_html(u)
            )
        })
        .unwrap_or_default();

    let mut html = format!(
        r#"<div class="detection-results">
{image}
<div class="card"><h6 class="card-title">Detection Summary</h6>
<ul class="list-group">
<li class="list-group-item"><span>Processing Time:</span><span class="badge bg-info">{processing}</span></li>
<li class="list-group-item"><span>Objects Detected:</span><span class="badge bg-primary">{count}</span></li>
</ul></div>
"#,
        processing = millis(outcome.processing_time_ms.as_ref()),
        count = outcome.detected_objects.len(),
    );

    if !outcome.detected_objects.is_empty() {
        html.push_str(r#"<div class="card"><h6 class="card-title">Detected Objects</h6><div class="row">"#);
        for object in &outcome.detected_objects {
            let corners = object
                .bounds
                .map(|rect| {
                    let (x_max, y_max) = rect.far_corner();
                    format!(
                        r#"<small class="text-muted">Box: ({}, {}) to ({}, {})</small>"#,
                        rect.x.round(),
                        rect.y.round(),
                        x_max.round(),
                        y_max.round()
                    )
                })
                .unwrap_or_default();
            let _ = write!(
                html,
                r#"<div class="result-object"><span>{label}</span><span class="badge {class}">{pct}%</span>{corners}</div>"#,
                label = object_label(object, "Unknown"),
                class = confidence_badge(object.confidence).css_class(),
                pct = confidence_percent(object.confidence),
            );
        }
        html.push_str("</div></div>\n");
    }

    html.push_str("</div>");
    html
}

/// Inline error panel for a rejected or failed upload.
pub fn upload_error(message: &str) -> String {
    format!(
        r#"<div class="alert alert-danger" id="errorSection"><span id="errorMessage">{}</span></div>"#,
        escape_html(message)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
