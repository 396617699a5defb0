/// Configuration schema and defaults for detwatch.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[services]`, `[client]`, `[polling]`, `[upload]`, and `[server]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level detwatch configuration.
///
/// Maps directly to the `~/.detwatch/config.toml` and `.detwatch.toml` file
/// schemas. Missing sections and fields fall back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetwatchConfig {
    pub services: ServicesConfig,
    pub client: ClientConfig,
    pub polling: PollingConfig,
    pub upload: UploadConfig,
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// [services]
// ---------------------------------------------------------------------------

/// Base URLs of the two remote collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Detection service base (`/detect`, `/detect/url`, `/detect/{id}`, ...).
    pub detection_url: String,
    /// Dashboard/analytics service base (`/metrics`, `/chart-data`, ...).
    pub dashboard_url: String,
    /// Per-request transport timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            detection_url: "http://localhost:8080/api".to_string(),
            dashboard_url: "http://localhost:3000/api/dashboard".to_string(),
            timeout_ms: 30_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [client]
// ---------------------------------------------------------------------------

/// Values of the `X-Client-Type` header sent to each service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Sent on dashboard/analytics reads.
    pub dashboard_client_type: String,
    /// Sent on detection-service calls.
    pub portal_client_type: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dashboard_client_type: "Web Portal Dashboard".to_string(),
            portal_client_type: "Web Portal".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [polling]
// ---------------------------------------------------------------------------

/// Poll cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between periodic refresh cycles.
    pub interval_secs: u64,
    /// `limit` sent to `/recent-detections`.
    pub recent_limit: u32,
    /// `limit` sent to `/error-logs`.
    pub error_log_limit: u32,
    /// Timeframe used for the initial analytics load.
    pub default_timeframe: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            recent_limit: 8,
            error_log_limit: 20,
            default_timeframe: "day".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [upload]
// ---------------------------------------------------------------------------

/// Client-side upload limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted image, in bytes.
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

/// Embedded web front settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for `detwatch serve`.
    pub bind: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl DetwatchConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `detwatch config init` to create a starting config file with
    /// all settings documented.
    pub fn default_toml() -> String {
        r#"# detwatch Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (DETWATCH_*)
#   2. Project config (.detwatch.toml in current directory)
#   3. User global config (~/.detwatch/config.toml)
#   4. Built-in defaults

[services]
detection_url = "http://localhost:8080/api"
dashboard_url = "http://localhost:3000/api/dashboard"
timeout_ms = 30000

[client]
dashboard_client_type = "Web Portal Dashboard"
portal_client_type = "Web Portal"

[polling]
interval_secs = 30
recent_limit = 8
error_log_limit = 20
default_timeframe = "day"   # day | week | month

[upload]
max_bytes = 10485760        # 10 MiB

[server]
bind = "127.0.0.1:9747"
open_browser = true
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
