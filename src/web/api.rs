//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content.

use std::io::Cursor;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::Response;

use crate::api::ImageUpload;
use crate::fingerprint::Environment;
use crate::poller::is_valid_timeframe;
use crate::render;
use crate::view::{self, delete_feedback, upload_feedback};

use super::{AppState, Incoming, JSON, respond};

// ---------------------------------------------------------------------------
// JSON request/response types
// ---------------------------------------------------------------------------

/// Detail panel response.
#[derive(Serialize)]
struct DetailResponse {
    key: String,
    html: String,
    found: bool,
}

/// `POST /api/detect/url` request body.
#[derive(Deserialize)]
struct DetectUrlRequest {
    #[serde(default)]
    url: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    json_with_status(data, 200)
}

fn json_with_status<T: Serialize>(data: &T, status: u16) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_vec(data).context("failed to serialize JSON response")?;
    Ok(respond(body, JSON, status))
}

fn bad_request(message: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    json_with_status(&serde_json::json!({ "error": message }), 400)
}

/// Look up a query parameter, percent-decoded.
fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Percent-decode one path segment.
fn decode_segment(raw: &str) -> String {
    url::form_urlencoded::parse(format!("k={}", raw.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| raw.to_string())
}

/// The client environment as reported by the browser's request headers.
fn environment(req: &Incoming) -> Environment {
    Environment::from_browser(
        req.header("user-agent"),
        req.header("accept-language"),
        req.header("x-screen"),
    )
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/view`: the current dashboard view.
pub fn get_view(state: &AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let snapshot = view::lock(&state.view).snapshot();
    json_response(&snapshot)
}

/// `POST /api/timeframe?value=`: switch the analytics timeframe.
///
/// Blocks until the analytics charts have been reloaded.
pub fn post_timeframe(state: &AppState, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let Some(value) = query_param(url, "value").filter(|v| is_valid_timeframe(v)) else {
        return bad_request("invalid timeframe");
    };
    state.poller.switch_timeframe(&value);
    get_view(state)
}

/// `POST /api/chart-timeframe?value=`: switch the API-calls chart timeframe.
pub fn post_chart_timeframe(state: &AppState, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let Some(value) = query_param(url, "value").filter(|v| is_valid_timeframe(v)) else {
        return bad_request("invalid timeframe");
    };
    state.poller.switch_chart_timeframe(&value);
    get_view(state)
}

/// `GET /api/detections/{key}`: the detail panel for one detection.
///
/// Keys from the recent list are served from the view. Other server ids are
/// fetched from the detection service; anything else gets the fallback
/// panel.
pub fn get_detection(state: &AppState, raw_key: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let key = decode_segment(raw_key);

    let cached = {
        let view = view::lock(&state.view);
        view.lookup(&key).map(render::detail_panel)
    };

    let (html, found) = match cached {
        Some(html) => (html, true),
        None if key.is_empty() || key.starts_with("det_") => (render::detail_fallback(), false),
        None => match state.client.get_detection(&key) {
            Ok(Some(detection)) => (render::detail_panel(&detection), true),
            Ok(None) => (render::detail_fallback(), false),
            Err(e) => {
                log::warn!("failed to load detection {key}: {e}");
                (render::detail_fallback(), false)
            }
        },
    };

    json_response(&DetailResponse { key, html, found })
}

/// `DELETE /api/detections/{key}`: delete one detection record.
///
/// On success the detail panel closes and the recent list is refreshed
/// shortly after.
pub fn delete_detection(
    state: &AppState,
    req: &Incoming,
    raw_key: &str,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let key = decode_segment(raw_key);
    if key.is_empty() {
        return bad_request("missing detection id");
    }

    let result = state.client.delete_detection(&key, &environment(req));
    if let Err(e) = &result {
        log::warn!("delete of {key} failed: {e}");
    }

    let feedback = delete_feedback(&result);
    if feedback.refresh {
        // Detached; the refresh lands in the view on its own.
        let _ = state.poller.after_delete();
    }
    json_response(&feedback)
}

/// `POST /api/detect`: upload the raw request body as an image.
///
/// The file name comes from `X-File-Name` and the type from `Content-Type`.
/// An empty body counts as no file selected.
pub fn post_detect(state: &AppState, req: &Incoming) -> Result<Response<Cursor<Vec<u8>>>> {
    let upload = (!req.body.is_empty()).then(|| {
        ImageUpload::new(
            req.header("x-file-name")
                .map(decode_segment)
                .unwrap_or_else(|| "upload".to_string()),
            req.header("content-type").unwrap_or(""),
            req.body.clone(),
        )
    });

    let result = state.client.detect_file(upload.as_ref(), &environment(req));
    finish_upload(state, result)
}

/// `POST /api/detect/url`: run detection on a remote image.
///
/// Expects JSON body: `{ "url": "https://..." }`
pub fn post_detect_url(state: &AppState, req: &Incoming) -> Result<Response<Cursor<Vec<u8>>>> {
    let body: DetectUrlRequest =
        serde_json::from_slice(&req.body).context("invalid JSON in detect request")?;
    let result = state.client.detect_url(&body.url, &environment(req));
    finish_upload(state, result)
}

fn finish_upload(
    state: &AppState,
    result: crate::api::ApiResult<crate::model::DetectionOutcome>,
) -> Result<Response<Cursor<Vec<u8>>>> {
    match &result {
        Ok(outcome) => log::info!(
            "detection complete: {} objects",
            outcome.detected_objects.len()
        ),
        Err(e) => log::warn!("detection failed: {e}"),
    }

    let feedback = upload_feedback(&result);
    if feedback.ok {
        let _ = state.poller.after_upload();
    }
    json_response(&feedback)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
