//! A scripted HTTP service on an ephemeral port.

#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use detwatch::config::DetwatchConfig;
use tiny_http::{Header, Method, Response, Server, StatusCode};

/// One request the fake service received.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
}

impl Hit {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct FakeService {
    pub base: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl FakeService {
    /// Serve `route(method, url) -> (status, json body)` until the test ends.
    pub fn spawn<F>(route: F) -> Self
    where
        F: Fn(&Method, &str) -> (u16, String) + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&hits);

        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);
                recorded.lock().unwrap().push(Hit {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                    body_len: body.len(),
                });

                let (status, body) = route(request.method(), request.url());
                let resp = Response::from_string(body)
                    .with_status_code(StatusCode(status))
                    .with_header(
                        Header::from_bytes("Content-Type", "application/json").unwrap(),
                    );
                let _ = request.respond(resp);
            }
        });

        Self {
            base: format!("http://{addr}"),
            hits,
        }
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    /// `METHOD url` of every hit, sorted.
    pub fn requests(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .hits()
            .iter()
            .map(|h| format!("{} {}", h.method, h.url))
            .collect();
        out.sort();
        out
    }

    /// Config pointing both services at this fake.
    pub fn config(&self) -> DetwatchConfig {
        let mut config = DetwatchConfig::default();
        config.services.detection_url = format!("{}/api", self.base);
        config.services.dashboard_url = format!("{}/api/dashboard", self.base);
        config.services.timeout_ms = 5_000;
        config.server.open_browser = false;
        config
    }
}

pub fn not_found() -> (u16, String) {
    (404, r#"{"error":"not found"}"#.to_string())
}
