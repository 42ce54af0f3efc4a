//! Error types for dpmeta-core.
//!
//! Every fallible operation returns [`MetadataResult`]. Nothing is retried:
//! errors surface to the caller exactly as they occurred.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::Violation;

pub type MetadataResult<T> = Result<T, MetadataError>;

#[derive(Debug, Error)]
pub enum MetadataError {
    /// No processing-block id was given and none is configured.
    #[error("no processing block id provided (argument or SDP_PB_ID)")]
    MissingIdentifier,

    /// A referenced record (processing block, execution block, script, file) is absent.
    #[error("{0}")]
    NotFound(String),

    /// A file record with the same normalized path already exists.
    #[error("File with same path already exists! ({0})")]
    DuplicatePath(String),

    /// The document failed schema validation; nothing was written.
    #[error("{message}")]
    Validation { message: String, errors: Vec<Violation> },

    /// A source document or table could not be read or parsed.
    #[error("failed to load {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    /// Filesystem failure while persisting.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding failure (YAML/JSON).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the configuration database client.
    #[error(transparent)]
    Config(#[from] dpmeta_config::ConfigError),

    /// Invalid caller-supplied argument or configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl MetadataError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Violations carried by a validation failure, empty for other variants.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { errors, .. } => errors,
            _ => &[],
        }
    }
}
