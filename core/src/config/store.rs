//! Configuration Store
//!
//! Loads and saves the TOML config file. Every section and field has a
//! default, so a missing file or a partial file is always usable.

use super::types::{Provider, ShellKind};
use crate::error::ConfigError;
use crate::llm::ApiKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables consulted for the credential, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["AICMD_API_KEY", "GEMINI_API_KEY"];

/// Unified aicmd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Decision service (language model) settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Command execution settings
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// `[llm]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// Overrides the provider's default URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Overrides the provider's default model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Transport retries on 429/5xx/network errors
    pub max_retries: u32,
    /// Stored credential; environment variables take precedence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: None,
            model: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: 120,
            max_retries: 2,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// `[agent]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Decision/action iterations allowed within one turn
    pub max_iterations: usize,
    /// Messages kept in the durable history across turns
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            history_limit: 20,
        }
    }
}

/// `[executor]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorConfig {
    pub shell: ShellKind,
    pub timeout_secs: u64,
    /// Per-stream limit; 0 disables truncation
    pub max_output_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: ShellKind::default(),
            timeout_secs: 60,
            max_output_chars: 16_000,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    /// Load from `path` if it exists; otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {}", path.display());
                crate::info_log!("Loading config from {}", path.display());
                Self::load(path)
            }
            Some(path) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        super::get_config_dir().map(|d| d.join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.agent.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "agent.history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the credential: explicit value, then environment, then file.
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Option<ApiKey> {
        let from_env = || {
            API_KEY_ENV_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok().as_deref().and_then(ApiKey::parse))
        };
        explicit
            .and_then(ApiKey::parse)
            .or_else(from_env)
            .or_else(|| self.llm.api_key.as_deref().and_then(ApiKey::parse))
    }

    /// Store or clear the credential. A blank value clears it.
    pub fn set_api_key(&mut self, key: &str) -> Option<ApiKey> {
        let parsed = ApiKey::parse(key);
        self.llm.api_key = parsed.as_ref().map(|k| k.expose().to_string());
        parsed
    }
}
