//! Configuration loading and validation for helpdesk.
//!
//! Loads configuration from a TOML file (default `helpdesk.toml` in the
//! working directory, overridable via `HELPDESK_CONFIG`) with environment
//! variable overrides for deployment-sensitive values. All settings are
//! validated at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Language model provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Context window management.
    #[serde(default)]
    pub context: ContextConfig,

    /// Agent loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// SQLite database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("context", &self.context)
            .field("agent", &self.agent)
            .field("database", &self.database)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for the model provider. Overridden by `HELPDESK_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for agent responses, titles, and summaries.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for intent classification. The classifier is a small,
    /// structured task; a lightweight model is enough.
    #[serde(default = "default_model")]
    pub router_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("router_model", &self.router_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            router_model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum estimated tokens a model call's context may occupy before
    /// compaction kicks in.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

fn default_max_context_tokens() -> usize {
    3000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard ceiling on tool-calling steps per agent invocation.
    #[serde(default = "default_max_tool_steps")]
    pub max_tool_steps: u32,
}

fn default_max_tool_steps() -> u32 {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_steps: default_max_tool_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path or URL. Overridden by `HELPDESK_DATABASE_URL`.
    /// Pass `sqlite::memory:` for an ephemeral database.
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sqlite://helpdesk.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists.
    ///
    /// Resolution order:
    /// 1. `HELPDESK_CONFIG` env var, if set (missing file is an error)
    /// 2. `helpdesk.toml` in the working directory, if present
    /// 3. Built-in defaults
    ///
    /// Environment overrides are applied afterwards in all cases.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if let Ok(path) = std::env::var("HELPDESK_CONFIG") {
            Self::from_file(Path::new(&path))?
        } else {
            let default_path = Path::new("helpdesk.toml");
            if default_path.exists() {
                Self::from_file(default_path)?
            } else {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply environment variable overrides for deploy-sensitive values.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("HELPDESK_API_KEY") {
            if !key.is_empty() {
                self.provider.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("HELPDESK_API_URL") {
            if !url.is_empty() {
                self.provider.api_url = url;
            }
        }
        if let Ok(db) = std::env::var("HELPDESK_DATABASE_URL") {
            if !db.is_empty() {
                self.database.url = db;
            }
        }
        if let Ok(port) = std::env::var("HELPDESK_PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.port = port;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.context.max_context_tokens == 0 {
            return Err(ConfigError::Invalid(
                "context.max_context_tokens must be greater than zero".into(),
            ));
        }
        if self.agent.max_tool_steps == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_tool_steps must be greater than zero".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Invalid(format!(
                "provider.temperature must be in [0.0, 2.0], got {}",
                self.provider.temperature
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.context.max_context_tokens, 3000);
        assert_eq!(config.agent.max_tool_steps, 5);
        assert_eq!(config.provider.model, "gpt-4o-mini");
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn from_file_parses_partial_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("helpdesk.toml");
        fs::write(
            &path,
            r#"
[provider]
model = "gpt-4o"
api_key = "sk-test"

[context]
max_context_tokens = 2000

[gateway]
port = 9000
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.context.max_context_tokens, 2000);
        assert_eq!(config.gateway.port, 9000);
        // Untouched sections keep defaults
        assert_eq!(config.agent.max_tool_steps, 5);
        assert_eq!(config.provider.router_model, "gpt-4o-mini");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/helpdesk.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn zero_budget_rejected() {
        let config = AppConfig {
            context: ContextConfig {
                max_context_tokens: 0,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-very-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
