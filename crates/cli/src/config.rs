//! Configuration loading from tiller.toml.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use mcp::{Endpoint, ServerCommand};
use serde::Deserialize;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/mcp";

/// Top-level configuration. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub agent: AgentConfig,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Model to use.
    pub model: String,

    pub max_tokens: u32,

    /// Anthropic API key, used only when the environment has none.
    pub api_key: Option<String>,

    /// Replacement for the Messages API URL.
    pub base_url: Option<String>,

    /// Let the model request several tool uses per turn.
    pub parallel_tool_use: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: runtime::DEFAULT_MODEL.to_string(),
            max_tokens: runtime::DEFAULT_MAX_TOKENS,
            api_key: None,
            base_url: None,
            parallel_tool_use: false,
        }
    }
}

/// The MCP server: either `url` or `command`, not both.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ServerConfig {
    /// Resolve the endpoint, defaulting to the local HTTP server.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        match (&self.url, &self.command) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousServer),
            (_, Some(command)) => Ok(Endpoint::Stdio(ServerCommand {
                command: command.clone(),
                args: self.args.clone(),
                env: self.env.clone(),
            })),
            (Some(url), None) => Ok(Endpoint::Http(url.clone())),
            (None, None) => Ok(Endpoint::Http(DEFAULT_SERVER_URL.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub system_prompt: String,

    /// First user message, sent before reading any input. Empty to start
    /// at the prompt.
    pub opening_prompt: String,

    pub turn_timeout_secs: u64,
    pub call_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant that can use the tools provided to you. \
                            To manage a customer database"
                .to_string(),
            opening_prompt: "How can you help me? Write a concise response.".to_string(),
            turn_timeout_secs: runtime::DEFAULT_TURN_TIMEOUT.as_secs(),
            call_timeout_secs: runtime::DEFAULT_CALL_TIMEOUT.as_secs(),
        }
    }
}

impl AgentConfig {
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("agent.turn_timeout_secs"));
        }
        if self.call_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("agent.call_timeout_secs"));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.server.endpoint()?;
        config.agent.validate()?;
        Ok(config)
    }

    /// Find the API key: process environment, then `env_file`, then the
    /// config file.
    ///
    /// The env file is read directly; the process environment is left as is.
    pub fn api_key(&self, env_file: &Path) -> Result<String, ConfigError> {
        let from_env = std::env::var(API_KEY_VAR).ok();
        resolve_api_key(from_env, env_file, self.backend.api_key.as_deref())
    }
}

fn resolve_api_key(
    from_env: Option<String>,
    env_file: &Path,
    configured: Option<&str>,
) -> Result<String, ConfigError> {
    if let Some(key) = from_env.filter(|k| !k.is_empty()) {
        return Ok(key);
    }
    if let Some(key) = read_env_file(env_file, API_KEY_VAR)? {
        return Ok(key);
    }
    configured
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingApiKey)
}

fn read_env_file(path: &Path, name: &str) -> Result<Option<String>, ConfigError> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(None),
        Err(e) => return Err(ConfigError::EnvFile(e.to_string())),
    };
    for entry in entries {
        let (key, value) = entry.map_err(|e| ConfigError::EnvFile(e.to_string()))?;
        if key == name && !value.is_empty() {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to read .env file: {0}")]
    EnvFile(String),

    #[error("ambiguous server: set either server.url OR server.command, not both")]
    AmbiguousServer,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("API key not configured: set {API_KEY_VAR} or backend.api_key")]
    MissingApiKey,
}
