mod credential;
mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use credential::ApiKey;
pub use loader::load_config;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Relay listen address
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream Messages API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API (e.g., "https://api.anthropic.com")
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Value sent as the `anthropic-version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Timeout for buffered upstream calls, in seconds. Streams are not timed out.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Model used when the request body omits one
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Token budget used when the request body omits one
    #[serde(default = "default_upstream_max_tokens")]
    pub default_max_tokens: u32,
}

fn default_upstream_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_upstream_max_tokens() -> u32 {
    1024
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_version: default_api_version(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_timeout(),
            default_model: default_model(),
            default_max_tokens: default_upstream_max_tokens(),
        }
    }
}

impl UpstreamConfig {
    /// Returns the base URL with trailing slash stripped
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Full URL of the Messages endpoint
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url())
    }

    /// Read the API key from the configured environment variable.
    ///
    /// Called once at startup; an unset or empty variable yields `None`.
    pub fn resolve_api_key(&self) -> Option<ApiKey> {
        std::env::var(&self.api_key_env).ok().and_then(ApiKey::new)
    }
}

/// Settings for the streaming client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Relay endpoint the client posts to
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Default budget for `call`, `stream` and `json`
    #[serde(default = "default_client_max_tokens")]
    pub max_tokens: u32,
    /// Default budget for `search_json`
    #[serde(default = "default_search_max_tokens")]
    pub search_max_tokens: u32,
}

fn default_relay_url() -> String {
    "http://127.0.0.1:8787/ai".to_string()
}

fn default_client_max_tokens() -> u32 {
    1000
}

fn default_search_max_tokens() -> u32 {
    1500
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            model: default_model(),
            max_tokens: default_client_max_tokens(),
            search_max_tokens: default_search_max_tokens(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load configuration, falling back to the default locations and then to
    /// built-in defaults when no file exists.
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                let default_paths = ["config.yaml", "config.yml", "./config/config.yaml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                tracing::debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".to_string()));
        }
        for (field, value) in [
            ("upstream.url", self.upstream.url.as_str()),
            ("client.relay_url", self.client.relay_url.as_str()),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| ConfigError::Validation(format!("{field} is not a valid URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!(
                    "{field} must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }
        if self.upstream.api_key_env.trim().is_empty() {
            return Err(ConfigError::Validation("upstream.api_key_env is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
