//! CLI command implementations for detwatch.
//!
//! Provides subcommand handlers for:
//! - `detwatch status`: connectivity probe and per-service status
//! - `detwatch metrics`: headline dashboard counters
//! - `detwatch detections`: paginated detection listing
//! - `detwatch show <id>` / `delete <id>`: one detection record
//! - `detwatch detect <file>` / `detect-url <url>`: run detection
//! - `detwatch stats`: detection statistics for a timeframe
//! - `detwatch config show|init|set|reset`: configuration management

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;

use crate::api::{ApiClient, DashboardApi, DetectionQuery, ImageUpload};
use crate::config::{self, DetwatchConfig};
use crate::fingerprint::Environment;
use crate::format::{
    BadgeTier, by_confidence, confidence_badge, confidence_percent, detail_stats,
    format_thousands, format_timestamp, time_ago, truncate,
};
use crate::model::{DetectedObject, Detection, DetectionOutcome, MetricsSnapshot, Numeric};
use crate::view::delete_feedback;

/// Output format for read commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

fn client(config: &DetwatchConfig) -> Result<ApiClient> {
    ApiClient::from_config(config)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn numeric(value: Option<&Numeric>, suffix: &str) -> String {
    value
        .map(|v| format!("{v}{suffix}"))
        .unwrap_or_else(|| "N/A".to_string())
}

fn colorize_tier(text: String, tier: BadgeTier) -> colored::ColoredString {
    match tier {
        BadgeTier::Success => text.green(),
        BadgeTier::Warning => text.yellow(),
        BadgeTier::Danger => text.red(),
    }
}

// ---------------------------------------------------------------------------
// detwatch status / probe
// ---------------------------------------------------------------------------

/// `true` when the dashboard service answers.
pub fn run_probe(config: &DetwatchConfig) -> Result<bool> {
    let api = client(config)?;
    let ok = api.probe();
    print_health_item(
        "Dashboard service",
        ok,
        &if ok {
            format!("reachable at {}", api.dashboard_base())
        } else {
            format!("cannot connect to {}", api.dashboard_base())
        },
    );
    Ok(ok)
}

/// Connectivity plus the system status table.
pub fn run_status(config: &DetwatchConfig, format: OutputFormat) -> Result<()> {
    let api = client(config)?;
    let services = api.system_status().context("failed to load system status")?;

    if format == OutputFormat::Json {
        return print_json(&services);
    }

    println!("{}", "detwatch System Status".bold().cyan());
    println!("{}", "=".repeat(60));
    print_health_item("Dashboard service", true, api.dashboard_base());
    println!();

    if services.is_empty() {
        println!("{}", "No services reported.".yellow());
        return Ok(());
    }

    println!(
        "  {:<22} {:<12} {:>6}  {:<12} Last Update",
        "Service", "Status", "Load", "Uptime"
    );
    println!("  {}", "-".repeat(66));
    for service in &services {
        let status = match service.status_class.as_str() {
            "success" => service.status.green(),
            "warning" => service.status.yellow(),
            _ => service.status.red(),
        };
        println!(
            "  {:<22} {:<12} {:>5.0}%  {:<12} {}",
            truncate(&service.service, 22),
            status,
            service.load,
            service.uptime,
            service.last_update.dimmed(),
        );
    }
    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// detwatch metrics
// ---------------------------------------------------------------------------

pub fn run_metrics(config: &DetwatchConfig, format: OutputFormat) -> Result<()> {
    let metrics = client(config)?
        .metrics()
        .context("failed to load metrics")?;

    match format {
        OutputFormat::Json => print_json(&metrics),
        OutputFormat::Table => {
            print_metrics_table(&metrics);
            Ok(())
        }
    }
}

fn print_metrics_table(metrics: &MetricsSnapshot) {
    let api_calls = match metrics.api_calls.as_ref() {
        Some(Numeric::Number(n)) => format_thousands(*n),
        other => numeric(other, ""),
    };

    println!("{}", "Dashboard Metrics".bold().cyan());
    println!("{}", "=".repeat(40));
    println!(
        "  {} {}",
        "Active sessions:  ".bold(),
        numeric(metrics.active_sessions.as_ref(), "")
    );
    println!("  {} {}", "API calls:        ".bold(), api_calls);
    println!(
        "  {} {}",
        "Avg response time:".bold(),
        numeric(metrics.response_time.as_ref(), "ms")
    );
    println!(
        "  {} {}",
        "Error rate:       ".bold(),
        numeric(metrics.error_rate.as_ref(), "%")
    );
}

// ---------------------------------------------------------------------------
// detwatch detections / show
// ---------------------------------------------------------------------------

pub fn run_detections(
    config: &DetwatchConfig,
    query: &DetectionQuery,
    format: OutputFormat,
) -> Result<()> {
    let listing = client(config)?
        .list_detections(query)
        .context("failed to list detections")?;

    if format == OutputFormat::Json {
        return print_json(listing.detections());
    }

    let detections = listing.detections();
    if detections.is_empty() {
        println!("{}", "No detections found.".yellow());
        return Ok(());
    }

    let now = Utc::now();
    println!("{}", "Detections".bold().cyan());
    println!(
        "  {:<16} {:>7} {:<16} {:<18} File",
        "Key", "Objects", "Device", "When"
    );
    println!("  {}", "-".repeat(76));
    for (i, detection) in detections.iter().enumerate() {
        let line = format!(
            "  {:<16} {:>7} {:<16} {:<18} {}",
            truncate(&detection.key(), 16),
            detection.objects.len(),
            truncate(detection.device.as_deref().unwrap_or("Unknown Device"), 16),
            time_ago(detection.timestamp.as_deref(), now),
            detection.file_name.as_deref().unwrap_or("Unknown file"),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    println!();
    let total = listing
        .total()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!(
        "  {}",
        format!(
            "page {} · {} shown · {} total",
            query.page,
            detections.len(),
            total
        )
        .dimmed()
    );
    Ok(())
}

pub fn run_show(config: &DetwatchConfig, id: &str, format: OutputFormat) -> Result<()> {
    let Some(detection) = client(config)?
        .get_detection(id)
        .context("failed to load detection")?
    else {
        anyhow::bail!("detection {id} not found");
    };

    match format {
        OutputFormat::Json => print_json(&detection),
        OutputFormat::Table => {
            print_detection(&detection);
            Ok(())
        }
    }
}

fn print_detection(detection: &Detection) {
    println!("{} {}", "Detection".bold().cyan(), detection.key().bold());
    println!("{}", "=".repeat(50));
    println!(
        "  {} {}",
        "Timestamp:      ".bold(),
        format_timestamp(detection.timestamp.as_deref())
    );
    println!(
        "  {} {}",
        "Device:         ".bold(),
        detection.device.as_deref().unwrap_or("Unknown Device")
    );
    println!(
        "  {} {}",
        "Processing time:".bold(),
        numeric(detection.processing_time.as_ref(), "ms")
    );
    println!(
        "  {} {}",
        "File name:      ".bold(),
        detection.file_name.as_deref().unwrap_or("Unknown file")
    );

    let stats = detail_stats(&detection.objects);
    let avg = stats
        .avg_confidence
        .map(|p| format!("{p}%"))
        .unwrap_or_else(|| "N/A".to_string());
    println!(
        "  {} {} objects, {} avg confidence, {} high confidence",
        "Summary:        ".bold(),
        stats.total,
        avg,
        stats.high_confidence
    );
    println!();

    if detection.objects.is_empty() {
        println!("  {}", "No objects detected in this image".dimmed());
        return;
    }
    for (i, object) in by_confidence(&detection.objects).into_iter().enumerate() {
        println!("  {}", object_line(i + 1, object));
    }
}

fn object_line(n: usize, object: &DetectedObject) -> String {
    let pct = colorize_tier(
        format!("{:>3}%", confidence_percent(object.confidence)),
        confidence_badge(object.confidence),
    );
    let position = object
        .bounds
        .map(|r| {
            format!(
                "({}, {}) {}×{}px",
                r.x.round(),
                r.y.round(),
                r.width.round(),
                r.height.round()
            )
        })
        .unwrap_or_default();
    format!(
        "#{n:<3} {:<20} {} {}",
        truncate(object.label.as_deref().unwrap_or("Unknown Object"), 20),
        pct,
        position.dimmed()
    )
}

// ---------------------------------------------------------------------------
// detwatch delete
// ---------------------------------------------------------------------------

pub fn run_delete(config: &DetwatchConfig, id: &str) -> Result<()> {
    let result = client(config)?.delete_detection(id, &Environment::from_host());
    let feedback = delete_feedback(&result);
    if result.is_ok() {
        println!("{} {}", "✓".green().bold(), feedback.message);
        Ok(())
    } else {
        anyhow::bail!(feedback.message)
    }
}

// ---------------------------------------------------------------------------
// detwatch detect / detect-url
// ---------------------------------------------------------------------------

pub fn run_detect(config: &DetwatchConfig, path: &Path, format: OutputFormat) -> Result<()> {
    let upload = ImageUpload::from_path(path)?;
    let outcome = client(config)?.detect_file(Some(&upload), &Environment::from_host())?;
    print_outcome(&outcome, format)
}

pub fn run_detect_url(config: &DetwatchConfig, url: &str, format: OutputFormat) -> Result<()> {
    let outcome = client(config)?.detect_url(url, &Environment::from_host())?;
    print_outcome(&outcome, format)
}

fn print_outcome(outcome: &DetectionOutcome, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(outcome);
    }

    println!("{}", "Detection Summary".bold().cyan());
    println!("{}", "=".repeat(40));
    if let Some(id) = &outcome.id {
        println!("  {} {}", "Detection ID:    ".bold(), id);
    }
    println!(
        "  {} {}",
        "Processing time: ".bold(),
        numeric(outcome.processing_time_ms.as_ref(), "ms")
    );
    println!(
        "  {} {}",
        "Objects detected:".bold(),
        outcome.detected_objects.len()
    );
    if let Some(url) = outcome
        .image_url
        .as_deref()
        .or(outcome.original_image_url.as_deref())
    {
        println!("  {} {}", "Image:           ".bold(), url.dimmed());
    }
    println!();

    for object in &outcome.detected_objects {
        let pct = colorize_tier(
            format!("{:>3}%", confidence_percent(object.confidence)),
            confidence_badge(object.confidence),
        );
        let corners = object
            .bounds
            .map(|r| {
                let (x_max, y_max) = r.far_corner();
                format!(
                    "Box: ({}, {}) to ({}, {})",
                    r.x.round(),
                    r.y.round(),
                    x_max.round(),
                    y_max.round()
                )
            })
            .unwrap_or_default();
        println!(
            "  {:<20} {} {}",
            truncate(object.label.as_deref().unwrap_or("Unknown"), 20),
            pct,
            corners.dimmed()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// detwatch stats
// ---------------------------------------------------------------------------

/// Statistics are service-defined; printed as JSON either way.
pub fn run_stats(config: &DetwatchConfig, timeframe: &str) -> Result<()> {
    let stats = client(config)?
        .statistics(timeframe)
        .context("failed to load statistics")?;
    print_json(&stats)
}

// ---------------------------------------------------------------------------
// detwatch config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective detwatch Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    if global_exists {
        println!("  {} {}", "✓".green(), "~/.detwatch/config.toml".dimmed());
    } else {
        println!(
            "  {} {}",
            "·".dimmed(),
            "~/.detwatch/config.toml (not found)".dimmed()
        );
    }
    if project_exists {
        println!("  {} {}", "✓".green(), ".detwatch.toml".dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), ".detwatch.toml (not found)".dimmed());
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "DETWATCH_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.detwatch/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to point detwatch at your services.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
