use std::collections::BTreeMap;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::mackerel::DEFAULT_TIMEOUT_MS;

/// Application configuration loaded from multiple sources.
///
/// Configuration is loaded in priority order (lowest to highest):
/// 1. Struct defaults
/// 2. config.yaml file (if exists)
/// 3. Environment variables with MACKEREL_ prefix (always wins)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the Mackerel API client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API endpoint base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (required — no compiled-in default).
    #[serde(default)]
    pub api_key: String,

    /// Dump every request and response at trace level.
    #[serde(default)]
    pub verbose: bool,

    /// User-Agent override. Falls back to `mackerel-agent/0.0.0`.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Extra headers sent with every request. Every value of a name is sent.
    #[serde(default)]
    pub default_headers: BTreeMap<String, Vec<String>>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_base_url() -> String {
    "https://api.mackerelio.com/".to_string()
}

// Cannot be const because serde uses function pointers for defaults
#[allow(clippy::missing_const_for_fn)]
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            verbose: false,
            user_agent: None,
            default_headers: BTreeMap::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ApiConfig {
    /// Minimal configuration: endpoint, key and verbosity, defaults otherwise.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, verbose: bool) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            verbose,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Convert the configured default headers into a [`HeaderMap`],
    /// appending every value.
    ///
    /// # Errors
    /// Returns a message naming the offending header if a name or value is
    /// not valid HTTP.
    pub fn header_map(&self) -> Result<HeaderMap, String> {
        let mut headers = HeaderMap::new();
        for (name, values) in &self.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| format!("invalid header name '{name}'"))?;
            for value in values {
                let header_value = HeaderValue::from_str(value)
                    .map_err(|_| format!("invalid value for header '{name}'"))?;
                headers.append(header_name.clone(), header_value);
            }
        }
        Ok(headers)
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Sources are merged in priority order:
    /// 1. Struct defaults (lowest)
    /// 2. config.yaml file (if exists)
    /// 3. Environment variables with MACKEREL_ prefix (highest)
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    /// Load configuration with a custom YAML file path.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load_from(yaml_path: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path))
            .merge(Env::prefixed("MACKEREL_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "api.api_key is required. Set MACKEREL_API__API_KEY environment variable or configure in config.yaml.".into(),
            ));
        }

        let base_url = &self.api.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "api.base_url '{base_url}' must start with http:// or https://"
            )));
        }

        if self.api.timeout_ms == 0 {
            return Err(ConfigError::Validation("api.timeout_ms cannot be 0".into()));
        }

        self.api
            .header_map()
            .map_err(|e| ConfigError::Validation(format!("api.default_headers: {e}")))?;

        Ok(())
    }
}
