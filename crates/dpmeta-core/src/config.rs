//! Runtime configuration for dpmeta-core.
//!
//! The library never reads environment variables on its own. A host (the CLI,
//! or a processing script embedding the library) builds a [`RuntimeConfig`]
//! and passes it in. [`RuntimeConfig::from_lookup`] maps the conventional
//! environment variable names onto the struct given any lookup function, so
//! hosts can feed it `std::env::var` and tests can feed it a map.

use std::path::PathBuf;

use dpmeta_config::backend::{parse_feature_flag, DEFAULT_ETCD_HOST, DEFAULT_ETCD_PORT};
use dpmeta_config::BackendKind;

use crate::errors::{MetadataError, MetadataResult};
use crate::DEFAULT_METADATA_FILENAME;

/// Environment variable names understood by [`RuntimeConfig::from_lookup`].
pub mod env {
    pub const PB_ID: &str = "SDP_PB_ID";
    pub const METADATA_FILENAME: &str = "METADATA_FILENAME";
    pub const FEATURE_CONFIG_DB: &str = "FEATURE_CONFIG_DB";
    pub const CONFIG_HOST: &str = "SDP_CONFIG_HOST";
    pub const CONFIG_PORT: &str = "SDP_CONFIG_PORT";
}

/// Process-level settings for metadata generation.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Processing block used when none is passed explicitly.
    pub processing_block_id: Option<String>,
    /// File name of the metadata document inside the product directory.
    pub metadata_filename: String,
    /// Where the data product volume is mounted.
    pub mount_root: PathBuf,
    /// Configuration database backend.
    pub config_backend: BackendKind,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            processing_block_id: None,
            metadata_filename: DEFAULT_METADATA_FILENAME.to_string(),
            mount_root: PathBuf::from("/"),
            config_backend: BackendKind::Memory,
        }
    }
}

impl RuntimeConfig {
    /// Build from an environment-like lookup.
    ///
    /// `networked_by_default` decides the backend when `FEATURE_CONFIG_DB` is
    /// unset or unparseable: deployed pipelines talk to etcd, tests do not.
    pub fn from_lookup<F>(lookup: F, networked_by_default: bool) -> MetadataResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let networked = non_empty(env::FEATURE_CONFIG_DB)
            .and_then(|v| parse_feature_flag(&v))
            .unwrap_or(networked_by_default);

        let config_backend = if networked {
            let host = non_empty(env::CONFIG_HOST).unwrap_or_else(|| DEFAULT_ETCD_HOST.to_string());
            let port = match non_empty(env::CONFIG_PORT) {
                Some(p) => p.trim().parse::<u16>().map_err(|_| {
                    MetadataError::invalid_argument(format!(
                        "{} is not a port number: {p}",
                        env::CONFIG_PORT
                    ))
                })?,
                None => DEFAULT_ETCD_PORT,
            };
            BackendKind::Etcd { host, port }
        } else {
            BackendKind::Memory
        };

        let cfg = Self {
            processing_block_id: non_empty(env::PB_ID),
            metadata_filename: non_empty(env::METADATA_FILENAME)
                .unwrap_or_else(|| DEFAULT_METADATA_FILENAME.to_string()),
            mount_root: PathBuf::from("/"),
            config_backend,
        };
        validate_config(&cfg)?;
        Ok(cfg)
    }

    pub fn with_processing_block(mut self, pb_id: impl Into<String>) -> Self {
        self.processing_block_id = Some(pb_id.into());
        self
    }

    pub fn with_mount_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.mount_root = root.into();
        self
    }
}

/// Validate a configuration object.
pub fn validate_config(cfg: &RuntimeConfig) -> MetadataResult<()> {
    let name = cfg.metadata_filename.as_str();
    if name.trim().is_empty() {
        return Err(MetadataError::invalid_argument("metadata filename must not be empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(MetadataError::invalid_argument(format!(
            "metadata filename must be a bare file name: {name}"
        )));
    }
    Ok(())
}
