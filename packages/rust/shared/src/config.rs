//! Application configuration for VidPack.
//!
//! User config lives at `~/.vidpack/vidpack.toml` and is optional.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, VidPackError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "vidpack.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".vidpack";

/// Placeholder replaced with the percent-encoded target URL.
pub const ENCODED_URL_PLACEHOLDER: &str = "{url}";

/// Placeholder replaced with the target URL verbatim.
pub const RAW_URL_PLACEHOLDER: &str = "{raw_url}";

// ---------------------------------------------------------------------------
// Config structs (matching vidpack.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend endpoints.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Document fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Chat-completion request settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// `[endpoints]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL of the chat-completion backend.
    #[serde(default = "default_chat_endpoint")]
    pub chat: String,

    /// Base URL of the voice-synthesis backend.
    #[serde(default = "default_speech_endpoint")]
    pub speech: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            chat: default_chat_endpoint(),
            speech: default_speech_endpoint(),
        }
    }
}

fn default_chat_endpoint() -> String {
    "http://localhost:10000".into()
}
fn default_speech_endpoint() -> String {
    "http://127.0.0.1:8000".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Relay templates, tried in order. Each must contain `{url}` or `{raw_url}`.
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,

    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            relays: default_relays(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_relays() -> Vec<String> {
    vec![
        "https://api.allorigins.win/raw?url={url}".into(),
        "https://corsproxy.io/?{url}".into(),
        "https://cors-anywhere.herokuapp.com/{raw_url}".into(),
    ]
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Model name sent in the request body.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "llama".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

impl AppConfig {
    /// Check endpoints and relay templates for obvious mistakes.
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("chat", &self.endpoints.chat),
            ("speech", &self.endpoints.speech),
        ] {
            Url::parse(endpoint).map_err(|e| {
                VidPackError::config(format!("invalid {name} endpoint '{endpoint}': {e}"))
            })?;
        }

        if self.fetch.relays.is_empty() {
            return Err(VidPackError::config("at least one relay template is required"));
        }

        for relay in &self.fetch.relays {
            if !relay.contains(ENCODED_URL_PLACEHOLDER) && !relay.contains(RAW_URL_PLACEHOLDER) {
                return Err(VidPackError::config(format!(
                    "relay template '{relay}' has no {ENCODED_URL_PLACEHOLDER} or {RAW_URL_PLACEHOLDER} placeholder"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.vidpack/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| VidPackError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.vidpack/vidpack.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| VidPackError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        VidPackError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| VidPackError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| VidPackError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| VidPackError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
