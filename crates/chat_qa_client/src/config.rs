//! Client config load/save for `~/.chat-qa/config.yaml`.
//! Sections: `api.*` (endpoint, key, models), `sampling.*`, `chat.*`.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::splitter::MarkerPair;

pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-ai/deepseek-r1-distill-llama-8b";
pub const DEFAULT_QA_MODEL: &str = "nvidia/llama-3.3-nemotron-super-49b-v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "<think>detailed thinking on</think>";
/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "NVIDIA_API_KEY";

/// API section (base_url, api_key, chat_model, qa_model).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qa_model: Option<String>,
}

impl ApiSection {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn chat_model(&self) -> &str {
        self.chat_model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)
    }

    pub fn qa_model(&self) -> &str {
        self.qa_model.as_deref().unwrap_or(DEFAULT_QA_MODEL)
    }

    /// The configured key, else `NVIDIA_API_KEY` from the environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_owned());
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SamplingSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Token cap for document answers, which are sent without penalties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qa_max_tokens: Option<u32>,
}

impl SamplingSection {
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.6)
    }

    pub fn top_p(&self) -> f32 {
        self.top_p.unwrap_or(0.95)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(4096)
    }

    pub fn frequency_penalty(&self) -> f32 {
        self.frequency_penalty.unwrap_or(0.0)
    }

    pub fn presence_penalty(&self) -> f32 {
        self.presence_penalty.unwrap_or(0.0)
    }

    pub fn qa_max_tokens(&self) -> u32 {
        self.qa_max_tokens.unwrap_or(2048)
    }
}

/// Chat section (system prompt, reasoning display, markers).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ChatSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reveal_reasoning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<MarkerPair>,
}

impl ChatSection {
    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn reveal_reasoning(&self) -> bool {
        self.reveal_reasoning.unwrap_or(false)
    }

    pub fn markers(&self) -> MarkerPair {
        self.markers.clone().unwrap_or_default()
    }
}

/// Full config file.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub sampling: SamplingSection,
    #[serde(default)]
    pub chat: ChatSection,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.chat.markers().is_valid() {
            return Err(ConfigError::EmptyMarker);
        }
        Ok(())
    }
}

/// Returns the default config file path: `~/.chat-qa/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".chat-qa").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load and validate config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = serde_yaml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Like [`load`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    match load(path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
        other => other,
    }
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents).map_err(io_err)
}

/// Config load/save error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no API key configured (set api.api_key or NVIDIA_API_KEY)")]
    MissingApiKey,
    #[error("reasoning markers must not be empty")]
    EmptyMarker,
}
