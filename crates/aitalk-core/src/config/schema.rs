//! Configuration schema.
//!
//! Hierarchy: `Config` → `ApiConfig`, `SessionsConfig`, `vision_models`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};

/// Root configuration — loaded from `~/.aitalk/config.json` + env vars.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api: ApiConfig,
    pub sessions: SessionsConfig,
    /// Models that accept image attachments.
    pub vision_models: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            sessions: SessionsConfig::default(),
            vision_models: vec![
                "gpt-4o".to_string(),
                "gpt-4-vision-preview".to_string(),
                "o4-mini".to_string(),
            ],
        }
    }
}

// ─────────────────────────────────────────────
// API
// ─────────────────────────────────────────────

/// Connection settings used for new sessions.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    /// Full chat completions URL.
    pub endpoint: String,
    /// Bearer token.
    pub api_key: String,
    /// Default model identifier.
    pub model: String,
    /// Persona prompt sent as a leading system message; empty disables it.
    pub system_prompt: String,
    /// Request timeout in seconds; `0` means no timeout.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            system_prompt: String::new(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &crate::utils::mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiConfig {
    /// Whether an API key is set.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// The persona prompt, if one is configured.
    pub fn persona(&self) -> Option<&str> {
        let prompt = self.system_prompt.trim();
        (!prompt.is_empty()).then_some(prompt)
    }
}

// ─────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────

/// Where session files live.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionsConfig {
    /// Session directory; `~` is expanded.
    pub dir: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: "~/.aitalk/sessions".to_string(),
        }
    }
}

impl SessionsConfig {
    pub fn resolved_dir(&self) -> std::path::PathBuf {
        crate::utils::expand_home(&self.dir)
    }
}
