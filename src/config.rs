//! Client configuration.
//!
//! Builder-style configuration for the chat client, with an environment
//! override for the backend URL.

use thiserror::Error;

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default path of the streaming chat endpoint.
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "CHATSTREAM_URL";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Base URL is empty
    #[error("base URL must not be empty")]
    EmptyBaseUrl,
    /// Base URL has no HTTP scheme
    #[error("base URL must start with http:// or https://: {0}")]
    InvalidScheme(String),
}

/// Configuration for [`ChatClient`](crate::client::ChatClient).
///
/// # Example
///
/// ```ignore
/// use chatstream::config::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_base_url("http://localhost:9000")
///     .with_chat_path("/v2/chat");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the chat backend
    pub base_url: String,
    /// Endpoint path appended to the base URL
    pub chat_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the chat endpoint path.
    pub fn with_chat_path(mut self, path: impl Into<String>) -> Self {
        self.chat_path = path.into();
        self
    }

    /// Create config from the environment.
    ///
    /// When `CHATSTREAM_URL` is set it overrides the base URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config = config.with_base_url(url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the config can produce a usable endpoint URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidScheme(self.base_url.clone()));
        }
        Ok(())
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }
}
