use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;

/// Environment variable that overrides [`ClientConfig::base_url`]
pub const BASE_URL_ENV: &str = "COACH_API_URL";

/// Settings for one client session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the REST API, without the `/api` suffix
    pub base_url: String,
    /// Transport timeout applied to every request
    pub request_timeout_ms: u64,
    /// How long a phone uniqueness answer is reused for the same number
    pub phone_check_ttl_ms: u64,
    /// Buffered toasts and refresh signals per subscriber
    pub notification_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_ms: 10_000,
            phone_check_ttl_ms: 5_000,
            notification_capacity: 64,
        }
    }
}

impl ClientConfig {
    /// Load settings from an optional YAML file, then apply environment overrides.
    /// A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => {
                info!("Loading client config from {}", path.display());
                Self::from_yaml_str(&std::fs::read_to_string(path)?)?
            }
            _ => Self::default(),
        };

        let config = config.with_base_url_override(std::env::var(BASE_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url.filter(|url| !url.trim().is_empty()) {
            self.base_url = base_url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "notification_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn phone_check_ttl(&self) -> Duration {
        Duration::from_millis(self.phone_check_ttl_ms)
    }
}
