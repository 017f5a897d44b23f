//! Configuration types
//!
//! All behavior of the service is driven by [`Config`]. Every field has a
//! sensible default; the only value without one is the target organization.
//! For the service binary, configuration is sourced from the environment via
//! [`Config::from_env`] and validated once at startup — a missing or invalid
//! required value is a fatal startup error, distinct from the pipeline's own
//! non-fatal per-repository errors.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default GitHub REST API base URL
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Top-level configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// The GitHub organization whose public repositories are reported on
    pub organization: String,

    /// Optional language filter: when set, report entries are projected to
    /// this single language's byte count
    #[serde(default)]
    pub selected_language: Option<String>,

    /// Optional GitHub token, passed through as a bearer header
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// GitHub API client settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Retry behavior for transient API failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// GitHub API client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Base URL of the GitHub REST API (default: <https://api.github.com>)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Repositories requested per listing page (default: 100, the API maximum)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum number of language fetches in flight at once (default: 8)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Overall deadline for the language-fetch fan-out stage
    ///
    /// When the deadline expires, in-flight fetches are abandoned and their
    /// repositories become partial entries; the report is still produced.
    #[serde(default, with = "optional_duration_serde")]
    pub fetch_deadline: Option<Duration>,

    /// Per-request timeout on the HTTP client (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request (required by the GitHub API)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            page_size: default_page_size(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_deadline: None,
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the API server binds to (default: 0.0.0.0:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable permissive CORS on the API (default: false)
    #[serde(default)]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: false,
        }
    }
}

impl Config {
    /// Create a configuration for the given organization with defaults for
    /// everything else
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            selected_language: None,
            token: None,
            github: GithubConfig::default(),
            retry: RetryConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Recognized variables:
    /// - `GITHUB_ORG` (required) — target organization
    /// - `GITHUB_LANGUAGE` — selected-language filter
    /// - `GITHUB_TOKEN` — bearer token passed through to the API
    /// - `GITHUB_API_BASE` — API base URL override
    /// - `PORT` — listen port (bound on 0.0.0.0)
    /// - `PAGE_SIZE` — listing page size
    /// - `FETCH_CONCURRENCY` — language-fetch concurrency limit
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a required variable is missing or a
    /// value fails to parse. Callers treat this as fatal at startup.
    pub fn from_env() -> Result<Self> {
        let organization = read_env("GITHUB_ORG")?.ok_or_else(|| Error::Config {
            message: "GITHUB_ORG must be set to the target organization".to_string(),
            key: Some("GITHUB_ORG".to_string()),
        })?;

        let mut config = Self::new(organization);
        config.selected_language = read_env("GITHUB_LANGUAGE")?;
        config.token = read_env("GITHUB_TOKEN")?;

        if let Some(api_base) = read_env("GITHUB_API_BASE")? {
            config.github.api_base = api_base;
        }
        if let Some(port) = read_parsed_env::<u16>("PORT")? {
            config.server.bind_address = SocketAddr::from(([0, 0, 0, 0], port));
        }
        if let Some(page_size) = read_parsed_env::<u32>("PAGE_SIZE")? {
            config.github.page_size = page_size;
        }
        if let Some(concurrency) = read_parsed_env::<usize>("FETCH_CONCURRENCY")? {
            config.github.max_concurrent_fetches = concurrency;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            return Err(config_error("organization must not be empty", "GITHUB_ORG"));
        }
        if self.github.page_size == 0 || self.github.page_size > 100 {
            return Err(config_error(
                "page_size must be between 1 and 100",
                "PAGE_SIZE",
            ));
        }
        if self.github.max_concurrent_fetches == 0 {
            return Err(config_error(
                "max_concurrent_fetches must be at least 1",
                "FETCH_CONCURRENCY",
            ));
        }
        if url::Url::parse(&self.github.api_base).is_err() {
            return Err(config_error(
                "api_base is not a valid URL",
                "GITHUB_API_BASE",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

/// Read an environment variable, treating empty values as unset
fn read_env(key: &str) -> Result<Option<String>> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config {
            message: format!("failed to read {}: {}", key, e),
            key: Some(key.to_string()),
        }),
    }
}

/// Read and parse an environment variable
fn read_parsed_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match read_env(key)? {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| Error::Config {
            message: format!("invalid value for {}: {}", key, e),
            key: Some(key.to_string()),
        }),
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("repolangs/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
