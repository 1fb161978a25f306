use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskdeckError};

/// Environment variable consulted for the agent API key when the config
/// file doesn't carry one.
pub const DEFAULT_AGENT_KEY_VAR: &str = "TASKDECK_AGENT_API_KEY";

/// Environment variable consulted for the agent endpoint.
pub const AGENT_ENDPOINT_VAR: &str = "TASKDECK_AGENT_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskdeckConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom path for the SQLite database. Defaults to
    /// `~/.config/taskdeck/taskdeck.db`.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the database path, falling back to the default location.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(ref p) = self.path {
            return PathBuf::from(p);
        }
        default_db_path()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Origins allowed by CORS. Empty means allow any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            allow_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the agent service; also read from
    /// `TASKDECK_AGENT_ENDPOINT`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Alternate environment variable to read the API key from.
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default = "default_agent_model")]
    pub model: String,
    #[serde(default = "default_agent_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_agent_timeout")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            env_var: None,
            model: default_agent_model(),
            max_tokens: default_agent_max_tokens(),
            timeout_secs: default_agent_timeout(),
        }
    }
}

impl AgentConfig {
    /// Resolve the agent endpoint: config field first, then environment.
    pub fn resolve_endpoint(&self) -> Option<String> {
        if let Some(ref e) = self.endpoint {
            if !e.is_empty() {
                return Some(e.clone());
            }
        }
        std::env::var(AGENT_ENDPOINT_VAR).ok().filter(|e| !e.is_empty())
    }

    /// Resolve the API key: config field first, then environment variable
    /// (`env_var` override or `TASKDECK_AGENT_API_KEY`).
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        let env_var = self.env_var.as_deref().unwrap_or(DEFAULT_AGENT_KEY_VAR);
        std::env::var(env_var).map_err(|_| {
            TaskdeckError::Config(format!(
                "agent requires an API key (set agent.api_key or {env_var})"
            ))
        })
    }

    /// First missing setting preventing the chat feature from working,
    /// for diagnostic display. `None` when fully configured.
    pub fn missing_setting(&self) -> Option<&'static str> {
        if !self.enabled {
            return Some("agent.enabled");
        }
        if self.resolve_endpoint().is_none() {
            return Some("agent.endpoint");
        }
        if self.resolve_api_key().is_err() {
            return Some("agent.api_key");
        }
        None
    }

    /// Whether the chat feature is usable with the current settings.
    pub fn is_configured(&self) -> bool {
        self.missing_setting().is_none()
    }
}

// -- Defaults --

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_web_port() -> u16 {
    8080
}
fn default_agent_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_agent_max_tokens() -> usize {
    1024
}
fn default_agent_timeout() -> u64 {
    30
}

fn default_db_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskdeck")
        .join("taskdeck.db")
}

impl TaskdeckConfig {
    /// Load configuration with two-layer TOML merge:
    /// 1. ~/.config/taskdeck/config.toml (global)
    /// 2. ./taskdeck.toml (project-local)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        let local = project_dir
            .unwrap_or_else(|| Path::new("."))
            .join("taskdeck.toml");
        if local.exists() {
            builder = builder.add_source(File::from(local).required(false));
        }

        let config = builder
            .build()
            .map_err(|e| TaskdeckError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| TaskdeckError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Load with defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig::default(),
            web: WebConfig::default(),
            agent: AgentConfig::default(),
        }
    }

    /// Validate config values, fixing what can be fixed and logging
    /// warnings. Lenient: never rejects the config outright.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.agent.max_tokens == 0 {
            warnings.push("agent.max_tokens = 0, setting to 256".to_string());
            self.agent.max_tokens = 256;
        }
        if self.agent.timeout_secs == 0 {
            warnings.push("agent.timeout_secs = 0, setting to 30".to_string());
            self.agent.timeout_secs = 30;
        }
        if self.agent.enabled && self.agent.resolve_endpoint().is_none() {
            warnings.push(
                "agent.enabled = true but no endpoint configured; chat will be disabled"
                    .to_string(),
            );
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("taskdeck").join("config.toml"))
}
