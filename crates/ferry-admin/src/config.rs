//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::AdminError;

/// Default Admin API version segment used in request paths.
pub const DEFAULT_API_VERSION: &str = "2024-01";

const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 600;

/// Configuration for [`crate::AdminClient`].
///
/// ```rust
/// use ferry_admin::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .api_version("2024-04")
///     .timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_version, "2024-04");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Version segment in `/admin/api/{version}/...`.
    pub api_version: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), AdminError> {
        if self.api_version.trim().is_empty() || self.api_version.contains('/') {
            return Err(AdminError::InvalidConnection(format!(
                "invalid API version '{}'",
                self.api_version
            )));
        }
        for (name, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("timeout_secs", self.timeout_secs),
        ] {
            if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&secs) {
                return Err(AdminError::InvalidConnection(format!(
                    "{} must be between {} and {} (got {})",
                    name, MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS, secs
                )));
            }
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<ClientConfig, AdminError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
