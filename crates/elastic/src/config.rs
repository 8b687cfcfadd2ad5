//! Connection configuration for the Elasticsearch cluster.
//!
//! [`ElasticConfiguration`] can be built programmatically, through a configure
//! callback, deserialized with serde, or parsed from command line flags and
//! environment variables via [`ElasticArgs`].
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ELASTIC_URL` | http://localhost:9200 | Cluster URL |
//! | `ELASTIC_DEFAULT_INDEX` | (none) | Default index for the client |
//! | `ELASTIC_USERNAME` | (none) | Basic auth username |
//! | `ELASTIC_PASSWORD` | (none) | Basic auth password |
//! | `ELASTIC_APPLICATION_NAME` | (none) | Application name attached to log records |
//! | `ELASTIC_REQUEST_TIMEOUT_MS` | (none) | Request timeout; client default when unset |
//! | `ELASTIC_API_VERSIONING` | true | Send API compatibility headers |
//!
//! # Example
//!
//! ```rust
//! use helios_elastic::ElasticConfiguration;
//!
//! let config = ElasticConfiguration::configure(|c| {
//!     c.url = "http://localhost:9200".to_string();
//!     c.application_name = Some("catalog".to_string());
//! });
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};

/// Settings for connecting to an Elasticsearch cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticConfiguration {
    /// Cluster URL (e.g., `http://localhost:9200`).
    pub url: String,

    /// Default index used by clients built from this configuration.
    #[serde(default)]
    pub default_index: Option<String>,

    /// Basic auth username. Only used together with `password`.
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password. Only used together with `username`.
    #[serde(default)]
    pub password: Option<String>,

    /// Application name attached to shipped log records.
    #[serde(default)]
    pub application_name: Option<String>,

    /// Request timeout in milliseconds. The client default applies when unset.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Whether to send the API compatibility `Accept`/`Content-Type` headers
    /// (default: true). Disable when talking to a 7.x cluster.
    #[serde(default = "default_api_versioning")]
    pub api_versioning: bool,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_api_versioning() -> bool {
    true
}

impl Default for ElasticConfiguration {
    fn default() -> Self {
        Self {
            url: default_url(),
            default_index: None,
            username: None,
            password: None,
            application_name: None,
            request_timeout_ms: None,
            api_versioning: default_api_versioning(),
            disable_certificate_validation: false,
        }
    }
}

impl ElasticConfiguration {
    /// Creates a configuration for the given cluster URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Builds a configuration by applying `configure` to the defaults.
    pub fn configure<F>(configure: F) -> Self
    where
        F: FnOnce(&mut ElasticConfiguration),
    {
        let mut config = Self::default();
        configure(&mut config);
        config
    }

    /// Sets the default index.
    pub fn with_default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = Some(index.into());
        self
    }

    /// Sets basic auth credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Enables or disables the API compatibility headers.
    pub fn with_api_versioning(mut self, enabled: bool) -> Self {
        self.api_versioning = enabled;
        self
    }

    /// Returns the basic auth credentials when both parts are non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Returns true if basic auth will be sent.
    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    /// Returns the default index, ignoring empty values.
    pub fn default_index(&self) -> Option<&str> {
        self.default_index.as_deref().filter(|i| !i.is_empty())
    }

    /// Returns the request timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.url.trim().is_empty() {
            errors.push("Elasticsearch URL cannot be empty".to_string());
        } else {
            match self.url.parse::<elasticsearch::http::Url>() {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                Ok(url) => errors.push(format!(
                    "Elasticsearch URL must use http or https, got '{}'",
                    url.scheme()
                )),
                Err(e) => errors.push(format!("Invalid Elasticsearch URL '{}': {}", self.url, e)),
            }
        }

        let has_user = self.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_pass = self.password.as_deref().is_some_and(|p| !p.is_empty());
        if has_user != has_pass {
            errors.push("Username and password must be provided together".to_string());
        }

        if self.request_timeout_ms == Some(0) {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Command line / environment arguments for [`ElasticConfiguration`].
///
/// Flatten into a binary's `clap::Parser` struct.
#[derive(Debug, Clone, Args)]
pub struct ElasticArgs {
    /// Elasticsearch cluster URL.
    #[arg(long = "elastic-url", env = "ELASTIC_URL", default_value = "http://localhost:9200")]
    pub url: String,

    /// Default index.
    #[arg(long = "elastic-default-index", env = "ELASTIC_DEFAULT_INDEX")]
    pub default_index: Option<String>,

    /// Basic auth username.
    #[arg(long = "elastic-username", env = "ELASTIC_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password.
    #[arg(long = "elastic-password", env = "ELASTIC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Application name attached to log records.
    #[arg(long = "elastic-application-name", env = "ELASTIC_APPLICATION_NAME")]
    pub application_name: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long = "elastic-request-timeout-ms", env = "ELASTIC_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Send API compatibility headers.
    #[arg(
        long = "elastic-api-versioning",
        env = "ELASTIC_API_VERSIONING",
        default_value = "true",
        action = clap::ArgAction::Set
    )]
    pub api_versioning: bool,
}

impl From<ElasticArgs> for ElasticConfiguration {
    fn from(args: ElasticArgs) -> Self {
        Self {
            url: args.url,
            default_index: args.default_index,
            username: args.username,
            password: args.password,
            application_name: args.application_name,
            request_timeout_ms: args.request_timeout_ms,
            api_versioning: args.api_versioning,
            disable_certificate_validation: false,
        }
    }
}
