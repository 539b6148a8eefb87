//! Client configuration.
//!
//! A [`ClientConfig`] names the MCP endpoint and carries everything the
//! transports need: extra headers, authentication, timeouts and the
//! reconnect policy of the notification listener. Configurations can be
//! built in code or loaded from JSON, YAML or TOML files.
//!
//! # Examples
//!
//! ```rust
//! use mcp_core::config::{AuthConfig, ClientConfig};
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("https://api.example.com/mcp")
//!     .unwrap()
//!     .with_auth(AuthConfig::bearer("secret-token"))
//!     .with_header("X-Team", "platform")
//!     .with_request_timeout(Duration::from_secs(10));
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{ConfigError, McpResult};
use crate::messages::Implementation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Complete configuration of an [`McpClient`](crate::client::McpClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// MCP endpoint. Streamable HTTP posts here; the SSE fallback opens its
    /// event stream here too.
    pub endpoint: Url,

    /// Deadline for a single request/response exchange
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// How long the SSE fallback waits for the server's `endpoint` event
    #[serde(with = "humantime_serde", default = "default_endpoint_timeout")]
    pub endpoint_timeout: Duration,

    /// Additional HTTP headers sent with every request
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Authentication configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Identity announced in the `initialize` request
    #[serde(default = "default_client_info")]
    pub client_info: Implementation,

    /// Reconnect policy of the notification listener
    #[serde(default)]
    pub listener: ListenerConfig,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_endpoint_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_client_info() -> Implementation {
    Implementation::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Configuration with default timeouts for the given endpoint URL.
    pub fn new(endpoint: impl AsRef<str>) -> McpResult<Self> {
        let endpoint = endpoint
            .as_ref()
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                parameter: "endpoint".to_string(),
                value: endpoint.as_ref().to_string(),
                reason: format!("Invalid URL: {}", e),
            })?;

        Ok(Self::for_url(endpoint))
    }

    /// Configuration with default timeouts for an already parsed URL.
    pub fn for_url(endpoint: Url) -> Self {
        Self {
            endpoint,
            request_timeout: default_request_timeout(),
            endpoint_timeout: default_endpoint_timeout(),
            headers: HashMap::new(),
            auth: None,
            client_info: default_client_info(),
            listener: ListenerConfig::default(),
        }
    }

    /// Add an HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set authentication configuration.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the SSE `endpoint` event timeout.
    pub fn with_endpoint_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint_timeout = timeout;
        self
    }

    /// Set the identity sent in `initialize`.
    pub fn with_client_info(mut self, client_info: Implementation) -> Self {
        self.client_info = client_info;
        self
    }

    /// Set the listener reconnect policy.
    pub fn with_listener(mut self, listener: ListenerConfig) -> Self {
        self.listener = listener;
        self
    }

    /// Validate the configuration and return the first problem found.
    pub fn validate(&self) -> McpResult<()> {
        if self.endpoint.scheme() != "http" && self.endpoint.scheme() != "https" {
            return Err(ConfigError::InvalidValue {
                parameter: "endpoint".to_string(),
                value: self.endpoint.to_string(),
                reason: "URL must use http or https scheme".to_string(),
            }
            .into());
        }

        for (name, value) in [
            ("request_timeout", self.request_timeout),
            ("endpoint_timeout", self.endpoint_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    parameter: name.to_string(),
                    value: format!("{:?}", value),
                    reason: "Timeout must be greater than zero".to_string(),
                }
                .into());
            }
        }

        if self.client_info.name.is_empty() {
            return Err(ConfigError::MissingParameter {
                parameter: "client_info.name".to_string(),
            }
            .into());
        }

        if let Some(ref auth) = self.auth {
            auth.validate()?;
        }

        self.listener.validate()
    }

    /// Load configuration from a file.
    ///
    /// Supports JSON, YAML, and TOML formats based on file extension.
    pub fn from_file(path: impl AsRef<Path>) -> McpResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_e| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason,
        };

        let config: Self = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => {
                serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?
            }
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file, choosing the format by extension.
    pub fn to_file(&self, path: impl AsRef<Path>) -> McpResult<()> {
        let path = path.as_ref();
        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason,
        };

        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => {
                serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?
            }
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| invalid(e.to_string()))?,
            ConfigFormat::Toml => toml::to_string(self).map_err(|e| invalid(e.to_string()))?,
        };

        std::fs::write(path, content).map_err(|e| invalid(e.to_string()))?;

        Ok(())
    }
}

enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> McpResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(ConfigError::InvalidFormat {
                path: path.display().to_string(),
                reason: "Unsupported file format. Use .json, .yaml, or .toml".to_string(),
            }
            .into()),
        }
    }
}

/// Reconnect policy of the background notification listener.
///
/// After a failed connection attempt the listener waits `min_backoff`,
/// doubling the wait after each further failure up to `max_backoff`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// First (and smallest) reconnect delay
    #[serde(with = "humantime_serde", default = "default_min_backoff")]
    pub min_backoff: Duration,

    /// Largest reconnect delay
    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    pub max_backoff: Duration,
}

fn default_min_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            min_backoff: default_min_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

impl ListenerConfig {
    /// Policy with explicit bounds.
    pub fn new(min_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            min_backoff,
            max_backoff,
        }
    }

    fn validate(&self) -> McpResult<()> {
        if self.min_backoff.is_zero() || self.min_backoff > self.max_backoff {
            return Err(ConfigError::InvalidValue {
                parameter: "listener".to_string(),
                value: format!("{:?}..{:?}", self.min_backoff, self.max_backoff),
                reason: "min_backoff must be non-zero and not exceed max_backoff".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Authentication configuration for the HTTP transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum AuthConfig {
    /// `Authorization: Bearer <token>`
    Bearer { token: String },

    /// Custom header-based authentication
    Header { name: String, value: String },
}

impl AuthConfig {
    /// Create a new bearer token authentication configuration.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Create a new custom header authentication configuration.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Validate the authentication configuration.
    pub fn validate(&self) -> McpResult<()> {
        match self {
            Self::Bearer { token } => {
                if token.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        parameter: "auth".to_string(),
                        value: "bearer".to_string(),
                        reason: "Token cannot be empty".to_string(),
                    }
                    .into());
                }
            }
            Self::Header { name, value } => {
                if name.is_empty() || value.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        parameter: "auth".to_string(),
                        value: "header".to_string(),
                        reason: "Header name and value cannot be empty".to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:8080/mcp").unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.endpoint_timeout, Duration::from_secs(30));
        assert_eq!(config.listener.min_backoff, Duration::from_secs(1));
        assert_eq!(config.listener.max_backoff, Duration::from_secs(30));
        assert_eq!(config.client_info.name, "mcp-core");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(ClientConfig::new("not a url").is_err());

        let ftp = ClientConfig::new("ftp://example.com/mcp").unwrap();
        assert!(ftp.validate().is_err());
    }

    #[test]
    fn test_auth_validation() {
        assert!(AuthConfig::bearer("").validate().is_err());
        assert!(AuthConfig::header("X-Key", "").validate().is_err());
        assert!(AuthConfig::header("X-Key", "abc").validate().is_ok());
    }

    #[test]
    fn test_listener_bounds_validation() {
        let config = ClientConfig::new("http://localhost/mcp")
            .unwrap()
            .with_listener(ListenerConfig::new(
                Duration::from_secs(5),
                Duration::from_secs(1),
            ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.yaml");

        let config = ClientConfig::new("https://api.example.com/mcp")
            .unwrap()
            .with_auth(AuthConfig::bearer("abc"))
            .with_header("X-Trace", "on")
            .with_request_timeout(Duration::from_millis(1500));

        config.to_file(&path).unwrap();
        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.json");

        let config = ClientConfig::new("http://127.0.0.1:3000/mcp")
            .unwrap()
            .with_listener(ListenerConfig::new(
                Duration::from_millis(250),
                Duration::from_secs(4),
            ));

        config.to_file(&path).unwrap();
        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_toml_file_with_humantime_durations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            r#"
endpoint = "https://tools.example.com/mcp"
request_timeout = "10s"

[auth]
type = "header"
name = "X-Api-Key"
value = "k-123"

[listener]
min_backoff = "500ms"
max_backoff = "1m"
"#,
        )
        .unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.endpoint_timeout, Duration::from_secs(30));
        assert_eq!(config.listener.min_backoff, Duration::from_millis(500));
        assert_eq!(config.listener.max_backoff, Duration::from_secs(60));
        assert_eq!(config.auth, Some(AuthConfig::header("X-Api-Key", "k-123")));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.ini");
        std::fs::write(&path, "endpoint=http://x").unwrap();

        let err = ClientConfig::from_file(&path).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
