//! Coarse device/browser/OS descriptor sent as `X-Device-Info` on every
//! mutating request.
//!
//! Detection is plain substring matching over the identification string
//! (user agent) with a fixed precedence; the first match wins. The
//! descriptor is informational only and never used as a credential.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Environment signals the fingerprint is derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Browser user agent, or a synthesized one for CLI calls.
    pub user_agent: String,
    /// `navigator.platform`-style string (`Win32`, `MacIntel`, `Linux x86_64`).
    pub platform: String,
    /// BCP 47 language tag.
    pub language: String,
    /// Screen size in pixels, when known.
    pub screen: Option<(u32, u32)>,
}

impl Environment {
    /// Describe the machine detwatch itself runs on.
    pub fn from_host() -> Self {
        let (ua_os, platform) = match std::env::consts::OS {
            "windows" => ("Windows NT 10.0; Win64; x64", "Win32"),
            "macos" => ("Macintosh; Intel Mac OS X 10_15_7", "MacIntel"),
            "android" => ("Linux; Android", "Linux armv8l"),
            "ios" => ("iPhone; CPU iPhone OS like Mac OS X", "iPhone"),
            "linux" => ("X11; Linux x86_64", "Linux x86_64"),
            other => (other, other),
        };

        Self {
            user_agent: format!(
                "Mozilla/5.0 ({ua_os}) detwatch/{}",
                env!("CARGO_PKG_VERSION")
            ),
            platform: platform.to_string(),
            language: host_language(),
            screen: None,
        }
    }

    /// Build from the headers a browser sent to the web front.
    ///
    /// `screen` is the `WxH` value the page reports in `X-Screen`.
    pub fn from_browser(
        user_agent: Option<&str>,
        accept_language: Option<&str>,
        screen: Option<&str>,
    ) -> Self {
        let user_agent = user_agent.unwrap_or("").to_string();
        let platform = browser_platform(&user_agent).to_string();
        let language = accept_language
            .and_then(|v| v.split(',').next())
            .map(|tag| tag.split(';').next().unwrap_or(tag).trim().to_string())
            .filter(|tag| !tag.is_empty())
            .unwrap_or_else(|| "en-US".to_string());

        Self {
            user_agent,
            platform,
            language,
            screen: screen.and_then(parse_screen),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Unknown,
}

/// Serialized form of the `X-Device-Info` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub os: String,
    pub browser: String,
    pub screen: String,
    pub language: String,
    pub platform: String,
    pub timestamp: String,
}

/// Classify an environment at a given instant.
pub fn describe(env: &Environment, now: DateTime<Utc>) -> DeviceInfo {
    let ua = env.user_agent.as_str();
    let screen = env
        .screen
        .map(|(w, h)| format!("{w}x{h}"))
        .unwrap_or_else(|| "0x0".to_string());

    DeviceInfo {
        device_type: device_type(ua),
        os: detect_os(ua).to_string(),
        browser: detect_browser(ua).to_string(),
        screen,
        language: env.language.clone(),
        platform: env.platform.clone(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// The JSON string attached as `X-Device-Info`.
pub fn fingerprint(env: &Environment, now: DateTime<Utc>) -> String {
    // A struct of strings and a unit enum always serializes.
    serde_json::to_string(&describe(env, now)).unwrap_or_else(|_| "{}".to_string())
}

fn detect_os(ua: &str) -> &'static str {
    if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else {
        "Unknown"
    }
}

fn detect_browser(ua: &str) -> &'static str {
    if ua.contains("Chrome") && !ua.contains("Edg") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") && !ua.contains("Chrome") {
        "Safari"
    } else if ua.contains("Edg") {
        "Edge"
    } else {
        "Unknown"
    }
}

fn device_type(ua: &str) -> DeviceType {
    if ua.trim().is_empty() {
        DeviceType::Unknown
    } else if ua.contains("Mobile") || ua.contains("Android") {
        DeviceType::Mobile
    } else if ua.contains("Tablet") || ua.contains("iPad") {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

/// Best guess at `navigator.platform` from a user agent.
fn browser_platform(ua: &str) -> &'static str {
    match detect_os(ua) {
        "Windows" => "Win32",
        "macOS" if ua.contains("iPhone") => "iPhone",
        "macOS" if ua.contains("iPad") => "iPad",
        "macOS" => "MacIntel",
        "Linux" => "Linux x86_64",
        "iOS" => "iPhone",
        _ => "Unknown",
    }
}

fn parse_screen(raw: &str) -> Option<(u32, u32)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// `LANG=en_US.UTF-8` → `en-US`.
fn host_language() -> String {
    std::env::var("LANG")
        .ok()
        .map(|v| v.split('.').next().unwrap_or("").replace('_', "-"))
        .filter(|tag| !tag.is_empty() && tag != "C" && tag != "POSIX")
        .unwrap_or_else(|| "en-US".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
