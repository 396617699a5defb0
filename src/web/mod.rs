//! Embedded web front for detwatch.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - The single-page dashboard shell
//! - The rendered dashboard view as JSON, refreshed by the background poller
//! - Detail panels, uploads, deletes and timeframe switches
//!
//! Launched via `detwatch serve` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::api::ApiClient;
use crate::config::DetwatchConfig;
use crate::poller::Poller;
use crate::view::{self, DashboardView, SharedView};

/// Everything a request handler may touch.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ApiClient>,
    pub poller: Poller<ApiClient>,
    pub view: SharedView,
}

impl AppState {
    pub fn new(config: &DetwatchConfig) -> Result<Self> {
        let client = Arc::new(ApiClient::from_config(config)?);
        let view = view::shared(DashboardView::new(&config.polling.default_timeframe));
        let poller = Poller::new(Arc::clone(&client), Arc::clone(&view), config);
        Ok(Self {
            client,
            poller,
            view,
        })
    }
}

/// A request with its body already read.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub method: Method,
    pub url: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Incoming {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// A bound web front.
pub struct WebServer {
    server: Server,
    state: AppState,
    body_limit: u64,
}

impl WebServer {
    pub fn bind(addr: &str, state: AppState) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;
        // One byte past the upload limit is enough to trip the size check.
        let body_limit = state.client.max_upload_bytes() + 1;
        Ok(Self {
            server,
            state,
            body_limit,
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Handle requests sequentially until the process exits.
    ///
    /// Errors are handled per request; none of them stops the server.
    pub fn run(self) {
        for mut request in self.server.incoming_requests() {
            let method = request.method().clone();
            let url = request.url().to_string();
            let headers = request
                .headers()
                .iter()
                .map(|h| {
                    (
                        h.field.as_str().as_str().to_ascii_lowercase(),
                        h.value.as_str().to_string(),
                    )
                })
                .collect();

            let mut body = Vec::new();
            if matches!(method, Method::Put | Method::Post | Method::Patch)
                && let Err(e) = request
                    .as_reader()
                    .take(self.body_limit)
                    .read_to_end(&mut body)
            {
                log::warn!("failed to read request body for {url}: {e}");
            }

            let incoming = Incoming {
                method: method.clone(),
                url: url.clone(),
                headers,
                body,
            };

            let resp = match dispatch(&self.state, &incoming) {
                Ok(resp) => resp,
                Err(e) => {
                    log::error!("{method} {url}: {e:#}");
                    let body = serde_json::json!({ "error": e.to_string() }).to_string();
                    respond(body.into_bytes(), JSON, 500)
                }
            };
            let status = resp.status_code().0;
            if let Err(e) = request.respond(resp) {
                log::warn!("failed to send response for {url}: {e}");
            }

            // Brief access log
            log::info!("{method} {url} {status}");
        }
    }
}

/// Start the poller and serve the dashboard on `config.server.bind`.
///
/// Blocks the current thread.
pub fn serve(config: &DetwatchConfig) -> Result<()> {
    let state = AppState::new(config)?;
    let server = WebServer::bind(&config.server.bind, state.clone())?;
    let addr = server
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|| config.server.bind.clone());

    let _poller = state.poller.spawn();

    println!("detwatch dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    if config.server.open_browser
        && let Err(e) = open_browser(&format!("http://{addr}"))
    {
        log::debug!("could not open browser: {e:#}");
    }

    server.run();
    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub fn dispatch(state: &AppState, req: &Incoming) -> Result<Response<Cursor<Vec<u8>>>> {
    let path = req.path();

    match (&req.method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API: View
        (&Method::Get, "/api/view") => api::get_view(state),
        (&Method::Post, "/api/timeframe") => api::post_timeframe(state, &req.url),
        (&Method::Post, "/api/chart-timeframe") => api::post_chart_timeframe(state, &req.url),

        // API: Uploads
        (&Method::Post, "/api/detect") => api::post_detect(state, req),
        (&Method::Post, "/api/detect/url") => api::post_detect_url(state, req),

        // API: Detections
        (&Method::Get, p) if p.starts_with("/api/detections/") => {
            api::get_detection(state, &p["/api/detections/".len()..])
        }
        (&Method::Delete, p) if p.starts_with("/api/detections/") => {
            api::delete_detection(state, req, &p["/api/detections/".len()..])
        }

        // 404
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub(crate) const JSON: &str = "application/json; charset=utf-8";
const HTML: &str = "text/html; charset=utf-8";

/// Build a response with the given content type and status.
pub(crate) fn respond(body: Vec<u8>, content_type: &str, status: u16) -> Response<Cursor<Vec<u8>>> {
    let resp = Response::from_data(body).with_status_code(StatusCode(status));
    match Header::from_bytes("Content-Type", content_type) {
        Ok(header) => resp.with_header(header),
        Err(()) => resp,
    }
}

/// Serve the embedded single-page frontend.
fn serve_frontend() -> Response<Cursor<Vec<u8>>> {
    respond(frontend::INDEX_HTML.as_bytes().to_vec(), HTML, 200)
}

/// 404 response.
fn not_found() -> Response<Cursor<Vec<u8>>> {
    respond(br#"{"error": "not found"}"#.to_vec(), JSON, 404)
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
