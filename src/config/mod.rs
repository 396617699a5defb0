/// Configuration system for detwatch.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::DetwatchConfig::default()`]
/// 2. **User global config**: `~/.detwatch/config.toml`
/// 3. **Project local config**: `.detwatch.toml` in the current working directory
/// 4. **Environment variables**: `DETWATCH_*` overrides (highest precedence)
///
/// # Usage
///
/// ```rust,ignore
/// use detwatch::config;
///
/// let cfg = config::load();
/// let client = ApiClient::from_config(&cfg);
/// ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::DetwatchConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved detwatch configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> DetwatchConfig {
    let mut config = DetwatchConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        config = global;
    }

    if let Some(project) = load_toml_file(project_config_path()) {
        config = project;
    }

    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed. A malformed file is logged and skipped so the
/// dashboard still starts on defaults.
fn load_toml_file(path: Option<PathBuf>) -> Option<DetwatchConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("ignoring malformed config {}: {e}", path.display());
            None
        }
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.detwatch/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".detwatch").join("config.toml"))
}

/// Path to the project local config: `.detwatch.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".detwatch.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `DETWATCH_DETECTION_URL`: detection service base URL
/// - `DETWATCH_DASHBOARD_URL`: dashboard/analytics service base URL
/// - `DETWATCH_TIMEOUT_MS`: per-request transport timeout
/// - `DETWATCH_POLL_INTERVAL_SECS`: seconds between refresh cycles
/// - `DETWATCH_BIND`: listen address of the web front
fn apply_env_overrides(config: &mut DetwatchConfig) {
    if let Ok(val) = std::env::var("DETWATCH_DETECTION_URL")
        && !val.is_empty()
    {
        config.services.detection_url = val;
    }
    if let Ok(val) = std::env::var("DETWATCH_DASHBOARD_URL")
        && !val.is_empty()
    {
        config.services.dashboard_url = val;
    }
    if let Ok(val) = std::env::var("DETWATCH_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.services.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("DETWATCH_POLL_INTERVAL_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        config.polling.interval_secs = secs;
    }
    if let Ok(val) = std::env::var("DETWATCH_BIND")
        && !val.is_empty()
    {
        config.server.bind = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.detwatch/config.toml`.
///
/// Creates the `~/.detwatch/` directory if it doesn't exist. Returns an error
/// if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.detwatch/ directory")?;
    }

    fs::write(&path, DetwatchConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or defaults), updates the specified key,
/// and writes the result back. Supports dotted keys like `services.dashboard_url`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&DetwatchConfig::default())
            .context("failed to serialize default config")?
    };

    let mut value_table: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut value_table, key, value)?;

    // Reject edits that would no longer deserialize into the schema.
    let output =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;
    toml::from_str::<DetwatchConfig>(&output)
        .with_context(|| format!("invalid value for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() < 2 {
        anyhow::bail!("config keys have the form 'section.field', got '{key}'");
    }

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];
    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("YES"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn set_toml_value_updates_string() {
        let toml_str = r#"
[services]
dashboard_url = "http://localhost:3000"
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "services.dashboard_url", "http://dash:9000").unwrap();

        let services = root.as_table().unwrap()["services"].as_table().unwrap();
        assert_eq!(services["dashboard_url"].as_str(), Some("http://dash:9000"));
    }

    #[test]
    fn set_toml_value_updates_integer() {
        let toml_str = r#"
[polling]
interval_secs = 30
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "polling.interval_secs", "10").unwrap();

        let polling = root.as_table().unwrap()["polling"].as_table().unwrap();
        assert_eq!(polling["interval_secs"].as_integer(), Some(10));
    }

    #[test]
    fn set_toml_value_updates_bool() {
        let toml_str = r#"
[server]
open_browser = true
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        set_toml_value(&mut root, "server.open_browser", "off").unwrap();

        let server = root.as_table().unwrap()["server"].as_table().unwrap();
        assert_eq!(server["open_browser"].as_bool(), Some(false));
    }

    #[test]
    fn set_toml_value_rejects_bad_integer() {
        let toml_str = r#"
[polling]
recent_limit = 8
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        assert!(set_toml_value(&mut root, "polling.recent_limit", "eight").is_err());
    }

    #[test]
    fn set_toml_value_rejects_unknown_keys() {
        let toml_str = r#"
[polling]
recent_limit = 8
"#;
        let mut root: toml::Value = toml::from_str(toml_str).unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "polling.nope", "1").is_err());
        assert!(set_toml_value(&mut root, "polling", "1").is_err());
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: DetwatchConfig = toml::from_str(&toml_str).unwrap();
    }
}
