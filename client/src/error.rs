use thiserror::Error;

/// Failure talking to the remote API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to serialize request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid API url '{0}'")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

/// Why a Storage Gateway operation did not reach the remote store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("remote store unavailable: {0}")]
    Remote(#[from] ApiError),

    #[error("value is not serializable: {0}")]
    Serialization(#[source] serde_json::Error),
}

pub type StorageResult = Result<(), StorageError>;

/// Invalid or unreadable client configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
