use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{GatewayError, Result};

/// Main configuration structure for the gateway
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream text-generation API configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Prompt validation thresholds
    #[serde(default)]
    pub validator: ValidatorConfig,
}

impl Config {
    /// Load configuration from an explicit path, or from the first default
    /// location that exists, falling back to built-in defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(&path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".contract-gateway").join("config.toml")),
            dirs::config_dir().map(|c| c.join("contract-gateway").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {e}")))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8000")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:8000".to_string()
}

/// Upstream API configuration as written in the config file.
///
/// Secrets never live in the file itself: `api_key_env` names the
/// environment variable holding the credential.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Streaming generation endpoint
    #[serde(default = "default_upstream_url")]
    pub url: String,
    /// Environment variable that overrides `url` when set
    #[serde(default = "default_url_env")]
    pub url_env: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds, applied between received chunks
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            url_env: default_url_env(),
            api_key_env: default_api_key_env(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    /// Resolve endpoint and credential from the process environment
    pub fn resolve(&self) -> Result<UpstreamSettings> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve endpoint and credential using the given variable lookup
    pub fn resolve_with<F>(&self, lookup: F) -> Result<UpstreamSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(&self.url_env)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.url.clone());

        let url = Url::parse(raw_url.trim())
            .map_err(|e| GatewayError::Config(format!("Invalid upstream URL '{raw_url}': {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(GatewayError::Config(format!(
                "Unsupported upstream URL scheme '{}': only http and https are allowed",
                url.scheme()
            )));
        }

        let api_key = lookup(&self.api_key_env)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                GatewayError::Config(format!(
                    "Missing API key: environment variable {} is not set",
                    self.api_key_env
                ))
            })?;

        Ok(UpstreamSettings {
            url,
            api_key,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        })
    }
}

fn default_upstream_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent"
        .to_string()
}

fn default_url_env() -> String {
    "GEMINI_URL".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    300
}

/// Resolved upstream settings, read-only after startup
#[derive(Clone)]
pub struct UpstreamSettings {
    pub url: Url,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("url", &self.url.as_str())
            .field("api_key", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

/// Heuristic thresholds for prompt validation
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorConfig {
    /// Maximum prompt length in characters after trimming
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Minimum prompt length in characters after trimming
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Business keyword occurrences needed when no legal term is present
    #[serde(default = "default_min_keyword_score")]
    pub min_keyword_score: usize,
    /// Minimum number of whitespace-separated words
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    /// Minimum ratio of distinct words to total words (0.0-1.0)
    #[serde(default = "default_min_distinct_ratio")]
    pub min_distinct_ratio: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            min_length: default_min_length(),
            min_keyword_score: default_min_keyword_score(),
            min_words: default_min_words(),
            min_distinct_ratio: default_min_distinct_ratio(),
        }
    }
}

fn default_max_length() -> usize {
    10_000
}

fn default_min_length() -> usize {
    10
}

fn default_min_keyword_score() -> usize {
    2
}

fn default_min_words() -> usize {
    3
}

fn default_min_distinct_ratio() -> f64 {
    0.3
}
