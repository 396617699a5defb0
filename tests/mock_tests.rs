//! The development mock answers the two routes the dashboard needs first.

use std::thread;

use detwatch::api::{ApiClient, ApiError, DashboardApi};
use detwatch::config::DetwatchConfig;
use detwatch::mock::MockServer;

fn client_for_mock() -> ApiClient {
    let server = MockServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.run());

    let mut config = DetwatchConfig::default();
    config.services.dashboard_url = format!("http://{addr}/api/dashboard");
    config.services.timeout_ms = 5_000;
    ApiClient::from_config(&config).unwrap()
}

#[test]
fn mock_metrics_decode() {
    let client = client_for_mock();
    let metrics = client.metrics().unwrap();
    let rate = metrics.error_rate.unwrap().as_f64().unwrap();
    assert!((0.0..=3.0).contains(&rate));
    let calls = metrics.api_calls.unwrap().as_f64().unwrap();
    assert!((2000.0..3000.0).contains(&calls));
    assert!(client.probe());
}

#[test]
fn mock_chart_has_eight_buckets() {
    let client = client_for_mock();
    let series = client.chart_data("week").unwrap();
    assert_eq!(series.len(), 8);
    assert_eq!(series.labels[0], "00:00");
}

#[test]
fn mock_other_routes_are_404() {
    let client = client_for_mock();
    match client.system_status() {
        Err(ApiError::Status { code, .. }) => assert_eq!(code, 404),
        other => panic!("unexpected: {other:?}"),
    }
}
