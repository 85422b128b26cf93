//! Config loader — reads `~/.aitalk/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.aitalk/config.json`
//! 3. Environment variables `AITALK_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path))
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `AITALK_API__ENDPOINT` → `api.endpoint`
/// - `AITALK_API__API_KEY` → `api.api_key`
/// - `AITALK_API__MODEL` → `api.model`
/// - `AITALK_API__SYSTEM_PROMPT` → `api.system_prompt`
/// - `AITALK_API__TIMEOUT_SECS` → `api.timeout_secs`
/// - `AITALK_SESSIONS__DIR` → `sessions.dir`
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(val) = lookup("AITALK_API__ENDPOINT") {
        config.api.endpoint = val;
    }
    if let Some(val) = lookup("AITALK_API__API_KEY") {
        config.api.api_key = val;
    }
    if let Some(val) = lookup("AITALK_API__MODEL") {
        config.api.model = val;
    }
    if let Some(val) = lookup("AITALK_API__SYSTEM_PROMPT") {
        config.api.system_prompt = val;
    }
    if let Some(val) = lookup("AITALK_API__TIMEOUT_SECS") {
        match val.parse::<u64>() {
            Ok(secs) => config.api.timeout_secs = secs,
            Err(_) => warn!("Ignoring invalid AITALK_API__TIMEOUT_SECS={}", val),
        }
    }
    if let Some(val) = lookup("AITALK_SESSIONS__DIR") {
        config.sessions.dir = val;
    }
    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
