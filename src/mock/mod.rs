//! Mock dashboard service for local development.
//!
//! Serves randomized `/api/dashboard/metrics` and `/api/dashboard/chart-data`
//! so the dashboard can run without the real backend. Every other path is a
//! 404, which the poller logs and skips.

use std::io::Cursor;
use std::net::SocketAddr;

use anyhow::Result;
use rand::Rng;
use serde_json::{Value, json};
use tiny_http::{Header, Method, Response, Server, StatusCode};

/// Hour buckets of the chart payload.
const CHART_LABELS: [&str; 8] = [
    "00:00", "03:00", "06:00", "09:00", "12:00", "15:00", "18:00", "21:00",
];

/// Lower bound of each chart bucket; every value adds `0..100` on top.
const CHART_BASES: [u32; 8] = [100, 80, 140, 200, 300, 250, 400, 300];

/// Random metrics. `errorRate` is a one-decimal string.
pub fn metrics_payload<R: Rng>(rng: &mut R) -> Value {
    json!({
        "activeSessions": rng.gen_range(5..25),
        "apiCalls": rng.gen_range(2000..3000),
        "responseTime": rng.gen_range(400..500),
        "errorRate": format!("{:.1}", rng.gen_range(0.0..3.0)),
    })
}

/// Random chart series over the fixed hour buckets.
pub fn chart_payload<R: Rng>(rng: &mut R) -> Value {
    let data: Vec<u32> = CHART_BASES
        .iter()
        .map(|base| base + rng.gen_range(0..100))
        .collect();
    json!({ "labels": CHART_LABELS, "data": data })
}

/// Route one request.
pub fn respond(method: &Method, url: &str) -> Response<Cursor<Vec<u8>>> {
    let path = url.split('?').next().unwrap_or(url).trim_end_matches('/');
    let mut rng = rand::thread_rng();

    let (status, body) = match (method, path) {
        (&Method::Get, "/api/dashboard/metrics") => (200, metrics_payload(&mut rng)),
        (&Method::Get, "/api/dashboard/chart-data") => (200, chart_payload(&mut rng)),
        _ => (404, json!({ "error": "not found" })),
    };

    let mut resp = Response::from_data(body.to_string().into_bytes()).with_status_code(StatusCode(status));
    if let Ok(h) = Header::from_bytes("Content-Type", "application/json; charset=utf-8") {
        resp = resp.with_header(h);
    }
    if let Ok(h) = Header::from_bytes("Access-Control-Allow-Origin", "*") {
        resp = resp.with_header(h);
    }
    resp
}

/// A bound mock server.
pub struct MockServer {
    server: Server,
}

impl MockServer {
    pub fn bind(addr: &str) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| anyhow::anyhow!("failed to start mock server on {addr}: {e}"))?;
        Ok(Self { server })
    }

    /// Bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until the process exits.
    pub fn run(self) {
        for request in self.server.incoming_requests() {
            let resp = respond(request.method(), request.url());
            log::debug!("mock {} {}", request.method(), request.url());
            if let Err(e) = request.respond(resp) {
                log::warn!("mock response failed: {e}");
            }
        }
    }
}

/// Bind and serve on `addr`, blocking the current thread.
pub fn serve(addr: &str) -> Result<()> {
    let server = MockServer::bind(addr)?;
    let shown = server
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|| addr.to_string());
    println!("mock dashboard service running at http://{shown}/api/dashboard");
    println!("Press Ctrl+C to stop.\n");
    server.run();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn metrics_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let m = metrics_payload(&mut rng);
            let sessions = m["activeSessions"].as_u64().unwrap();
            assert!((5..25).contains(&sessions));
            let calls = m["apiCalls"].as_u64().unwrap();
            assert!((2000..3000).contains(&calls));
            let rt = m["responseTime"].as_u64().unwrap();
            assert!((400..500).contains(&rt));
            let rate: f64 = m["errorRate"].as_str().unwrap().parse().unwrap();
            assert!((0.0..=3.0).contains(&rate));
        }
    }

    #[test]
    fn chart_payload_is_a_valid_series() {
        let mut rng = StdRng::seed_from_u64(1);
        let payload = chart_payload(&mut rng);
        let series: crate::model::ChartSeries = serde_json::from_value(payload).unwrap();
        assert_eq!(series.len(), 8);
        for ((_, value), base) in series.points().zip(CHART_BASES) {
            assert!(value >= base as f64 && value < base as f64 + 100.0);
        }
    }

    #[test]
    fn unknown_paths_are_404() {
        let resp = respond(&Method::Get, "/api/dashboard/system-status");
        assert_eq!(resp.status_code(), StatusCode(404));
        let resp = respond(&Method::Get, "/api/dashboard/metrics?x=1");
        assert_eq!(resp.status_code(), StatusCode(200));
    }
}
