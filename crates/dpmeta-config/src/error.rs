//! Error types for the configuration database client.

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The selected backend is not compiled into this build.
    #[error("config backend unavailable: {0}")]
    Unavailable(String),

    /// Transport or storage failure inside the backend.
    #[error("config backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("config record serialization error: {0}")]
    Serialization(String),

    /// A create was attempted on a key that already holds a record.
    #[error("config record already exists: {0}")]
    AlreadyExists(String),

    /// An update or delete was attempted on a key with no record.
    #[error("config record does not exist: {0}")]
    Missing(String),
}

impl ConfigError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
