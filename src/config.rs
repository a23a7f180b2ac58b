//! Configuration management for the FQE client.
//!
//! Handles loading client settings from a TOML file. Command-line flags are
//! layered on top by the binary; the library itself never reads the
//! environment.

use crate::error::{FqeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default base URL for the JSON query endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default base URL of the DuckDB HTTP server used by the smoke tests.
pub const DEFAULT_RAW_BASE_URL: &str = "http://localhost:8082";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default `max_result_rows` flag sent to the raw endpoint.
pub const DEFAULT_MAX_RESULT_ROWS: u64 = 1000;

/// Main configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Client connection settings.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Which HTTP surface the query service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// `GET /health` and `POST /query` with a JSON body.
    #[default]
    Json,
    /// `GET /` and `POST /?...` with the SQL as a plain-text body.
    Raw,
}

impl Endpoint {
    /// Parses an endpoint variant from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "raw" | "text" => Some(Self::Raw),
            _ => None,
        }
    }

    /// Returns the variant as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Raw => "raw",
        }
    }

    /// Path probed for liveness.
    pub fn health_path(&self) -> &'static str {
        match self {
            Self::Json => "/health",
            Self::Raw => "/",
        }
    }
}

/// Optional authentication attached to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Auth {
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: Option<String>,
    },
}

/// Connection settings for one client instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the query service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// HTTP surface variant.
    #[serde(default)]
    pub endpoint: Endpoint,

    /// Row cap passed to the raw endpoint.
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<Auth>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_result_rows() -> u64 {
    DEFAULT_MAX_RESULT_ROWS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            endpoint: Endpoint::default(),
            max_result_rows: default_max_result_rows(),
            auth: None,
        }
    }
}

impl ClientConfig {
    /// Creates a config for the given base URL with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the endpoint variant.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the authentication.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Returns the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the base URL and returns it without a trailing slash.
    pub fn normalized_base_url(&self) -> Result<String> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| FqeError::config(format!("Invalid base URL '{}': {e}", self.base_url)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FqeError::config(format!(
                "Invalid scheme '{}'. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        Ok(self.base_url.trim_end_matches('/').to_string())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fqe-client")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| FqeError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            FqeError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
