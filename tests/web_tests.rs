//! Upload, delete and detail flows through the web front's router.

mod support;

use std::thread;
use std::time::{Duration, Instant};

use detwatch::api::{ApiClient, ApiError, ImageUpload};
use detwatch::fingerprint::Environment;
use detwatch::web::{self, AppState, Incoming};
use serde_json::Value;
use support::{FakeService, not_found};
use tiny_http::Method;

const OUTCOME: &str = r#"{"id":"new-1","imageUrl":"http://img/p.png","processingTimeMs":87,
    "detectedObjects":[{"label":"cat","confidence":0.91,"boundingBox":{"x":10,"y":20,"width":30,"height":40}}]}"#;

fn detection_service(method: &Method, url: &str) -> (u16, String) {
    let path = url.split('?').next().unwrap_or(url);
    match (method, path) {
        (&Method::Post, "/api/detect") => (200, OUTCOME.to_string()),
        (&Method::Post, "/api/detect/url") => (200, r#"{"error":"Model not loaded"}"#.to_string()),
        (&Method::Get, "/api/detect/srv-9") => (
            200,
            r#"{"id":"srv-9","device":"cam","objects":[{"label":"bus","confidence":0.82}]}"#.to_string(),
        ),
        (&Method::Delete, "/api/detect/gone") => not_found(),
        (&Method::Delete, "/api/detect/locked") => (500, "{}".to_string()),
        (&Method::Delete, "/api/detect/ok") => (200, r#"{"deleted":true}"#.to_string()),
        (&Method::Get, "/api/dashboard/recent-detections") => (200, "[]".to_string()),
        _ => not_found(),
    }
}

fn body_json(resp: tiny_http::Response<std::io::Cursor<Vec<u8>>>) -> Value {
    serde_json::from_slice(&resp.into_reader().into_inner()).unwrap()
}

fn call(state: &AppState, req: Incoming) -> Value {
    body_json(web::dispatch(state, &req).unwrap())
}

fn wait_for(fake: &FakeService, request: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if fake.requests().iter().any(|r| r == request) {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[test]
fn oversized_upload_never_reaches_the_service() {
    let fake = FakeService::spawn(detection_service);
    let client = ApiClient::from_config(&fake.config()).unwrap();
    let upload = ImageUpload::new("big.png", "image/png", vec![0u8; 15 * 1024 * 1024]);

    let err = client
        .detect_file(Some(&upload), &Environment::from_host())
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(err.to_string(), "File size must be less than 10MB.");
    assert!(fake.hits().is_empty());
}

#[test]
fn upload_through_web_front_renders_result() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let req = Incoming::new(Method::Post, "/api/detect")
        .with_header("Content-Type", "image/png")
        .with_header("X-File-Name", "photo%20one.png")
        .with_header("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0")
        .with_header("X-Screen", "1920x1080")
        .with_body(vec![0x89, b'P', b'N', b'G']);

    let res = call(&state, req);
    assert_eq!(res["ok"], true);
    let html = res["html"].as_str().unwrap();
    assert!(html.contains("Box: (10, 20) to (40, 60)"));
    assert!(html.contains("87ms"));

    let hit = fake
        .hits()
        .into_iter()
        .find(|h| h.method == "POST" && h.url == "/api/detect")
        .unwrap();
    assert!(hit.header("Content-Type").unwrap().starts_with("multipart/form-data; boundary="));
    assert_eq!(hit.header("X-Client-Type"), Some("Web Portal"));
    let device_info = hit.header("X-Device-Info").unwrap();
    assert!(device_info.contains("1920x1080"));

    // Metrics and recent detections follow shortly after.
    assert!(wait_for(&fake, "GET /api/dashboard/recent-detections?limit=8"));
}

#[test]
fn empty_upload_asks_for_a_file() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let res = call(&state, Incoming::new(Method::Post, "/api/detect"));
    assert_eq!(res["ok"], false);
    assert_eq!(res["rejected_locally"], true);
    assert!(res["html"].as_str().unwrap().contains("Please select an image file first."));
    assert!(fake.hits().is_empty());
}

#[test]
fn non_image_upload_is_rejected() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let req = Incoming::new(Method::Post, "/api/detect")
        .with_header("Content-Type", "text/plain")
        .with_body(b"hello".to_vec());
    let res = call(&state, req);
    assert!(res["html"].as_str().unwrap().contains("Please select a valid image file."));
    assert!(fake.hits().is_empty());
}

#[test]
fn url_detection_surfaces_application_error() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let req = Incoming::new(Method::Post, "/api/detect/url")
        .with_body(br#"{"url":"https://example.com/a.jpg"}"#.to_vec());
    let res = call(&state, req);
    assert_eq!(res["ok"], false);
    assert_eq!(res["rejected_locally"], false);
    assert!(res["html"].as_str().unwrap().contains("Model not loaded"));
}

#[test]
fn invalid_url_is_rejected_locally() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let req = Incoming::new(Method::Post, "/api/detect/url").with_body(br#"{"url":"not a url"}"#.to_vec());
    let res = call(&state, req);
    assert!(res["html"].as_str().unwrap().contains("Please enter a valid URL."));
    assert!(fake.hits().is_empty());
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_of_missing_detection_keeps_panel_open() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let res = call(&state, Incoming::new(Method::Delete, "/api/detections/gone"));

    assert_eq!(res["alert"], "error");
    assert_eq!(res["message"], "Failed to delete detection: Detection not found");
    assert_eq!(res["close_detail"], false);
    assert_eq!(res["refresh"], false);
}

#[test]
fn delete_failure_uses_generic_message() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let res = call(&state, Incoming::new(Method::Delete, "/api/detections/locked"));
    assert_eq!(res["message"], "Failed to delete detection: Failed to delete detection");
    assert_eq!(res["close_detail"], false);
}

#[test]
fn successful_delete_refreshes_recent_list() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let res = call(&state, Incoming::new(Method::Delete, "/api/detections/ok"));

    assert_eq!(res["alert"], "success");
    assert_eq!(res["message"], "Detection record deleted successfully");
    assert_eq!(res["close_detail"], true);
    assert!(wait_for(&fake, "GET /api/dashboard/recent-detections?limit=8"));

    let hit = fake
        .hits()
        .into_iter()
        .find(|h| h.method == "DELETE")
        .unwrap();
    assert!(hit.header("X-Device-Info").is_some());
}

// ---------------------------------------------------------------------------
// Detail and view
// ---------------------------------------------------------------------------

#[test]
fn detail_falls_back_to_service_lookup() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();

    let res = call(&state, Incoming::new(Method::Get, "/api/detections/srv-9"));
    assert_eq!(res["found"], true);
    assert!(res["html"].as_str().unwrap().contains("bus"));

    let res = call(&state, Incoming::new(Method::Get, "/api/detections/det_123"));
    assert_eq!(res["found"], false);
    assert!(res["html"].as_str().unwrap().contains("Data Unavailable"));
    assert!(!fake.requests().iter().any(|r| r.contains("det_123")));

    let res = call(&state, Incoming::new(Method::Get, "/api/detections/unknown"));
    assert_eq!(res["found"], false);
}

#[test]
fn timeframe_switch_validates_value() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();

    let resp = web::dispatch(&state, &Incoming::new(Method::Post, "/api/timeframe?value=a%26b")).unwrap();
    assert_eq!(resp.status_code().0, 400);

    let res = call(&state, Incoming::new(Method::Post, "/api/timeframe?value=week"));
    assert_eq!(res["timeframe"], "week");
    assert_eq!(res["chart_timeframe"], "day");

    let res = call(&state, Incoming::new(Method::Post, "/api/chart-timeframe?value=month"));
    assert_eq!(res["chart_timeframe"], "month");
}

#[test]
fn view_snapshot_starts_empty() {
    let fake = FakeService::spawn(detection_service);
    let state = AppState::new(&fake.config()).unwrap();
    let res = call(&state, Incoming::new(Method::Get, "/api/view"));
    assert!(res["sections"].as_object().unwrap().is_empty());
    assert!(res["connected"].is_null());
    assert_eq!(res["timeframe"], "day");
}
