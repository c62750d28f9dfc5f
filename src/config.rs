//! Application configuration module
//!
//! Settings are layered: built-in defaults, then an optional
//! `table-admin.toml` in the working directory, then `TABLE_ADMIN__*`
//! environment variables (a `.env` file is loaded first), then command-line
//! overrides applied by the binary.
//!
//! ```text
//! TABLE_ADMIN__API__BASE_URL=https://api.example.com
//! TABLE_ADMIN__API__TIMEOUT_SECS=10
//! TABLE_ADMIN__UI__PAGE_SIZE=25
//! TABLE_ADMIN__SESSION__FILE=/tmp/table-admin-session.json
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

const CONFIG_FILE: &str = "table-admin";
const ENV_PREFIX: &str = "TABLE_ADMIN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Record browser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub page_size: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { page_size: 15 }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Overrides the per-user default location
    pub file: Option<PathBuf>,
}

/// Complete application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub session: SessionConfig,
}

impl Settings {
    /// Load settings from defaults, the optional config file and environment
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let raw = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let settings: Settings = raw.try_deserialize()?;
        settings.validated()
    }

    /// Check values and normalize the base URL (no trailing slash)
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.api.base_url = normalize_base_url(&self.api.base_url)?;

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "api.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.ui.page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "ui.page_size must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }

    /// Where the authenticated user is persisted
    pub fn session_path(&self) -> PathBuf {
        self.session.file.clone().unwrap_or_else(default_session_path)
    }
}

/// Parse an http(s) base URL and strip any trailing slash
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid API base URL '{}': {}", raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(format!(
            "Unsupported API base URL scheme '{}' (expected http or https)",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidValue(
            "Missing host in API base URL".to_string(),
        ));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Default session file
/// - Linux/macOS: `~/.config/table-admin/session.json`
/// - Fallback: `.table-admin/session.json` in the working directory
pub fn default_session_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("table-admin").join("session.json")
    } else if let Some(home_dir) = dirs::home_dir() {
        home_dir
            .join(".config")
            .join("table-admin")
            .join("session.json")
    } else {
        PathBuf::from(".table-admin").join("session.json")
    }
}
