//! dpmeta-config
//!
//! Client for the processing configuration database.
//!
//! The metadata tooling only ever needs a narrow slice of the configuration
//! database:
//! - processing-block records (by id)
//! - execution-block records (by id)
//! - script records (by kind + name + version)
//! - deployment records (by id)
//!
//! Records are stored as JSON values under stable keys (see [`keys`]). The
//! storage backend is selectable at runtime between an in-process memory
//! store and the networked etcd backend (`etcd` feature, enabled by default).
//!
//! Access goes through a scoped transaction:
//!
//! ```ignore
//! let client = dpmeta_config::new_config_client(&BackendKind::Memory)?;
//! let pb = client.txn(|txn| txn.processing_block("pb-test-20240101-00000"))?;
//! ```

pub mod backend;
pub mod client;
pub mod entity;
pub mod error;

pub use crate::backend::{Backend, BackendKind, MemoryBackend};
pub use crate::client::{new_config_client, ConfigClient, Txn};
pub use crate::entity::{Deployment, ExecutionBlock, ProcessingBlock, Script, ScriptKey};
pub use crate::error::{ConfigError, ConfigResult};

#[cfg(feature = "etcd")]
pub use crate::backend::EtcdBackend;

/// Key layout inside the configuration database.
pub mod keys {
    use crate::entity::ScriptKey;

    pub const PROCESSING_BLOCK: &str = "/pb";
    pub const EXECUTION_BLOCK: &str = "/eb";
    pub const SCRIPT: &str = "/script";
    pub const DEPLOYMENT: &str = "/deploy";

    pub fn processing_block(pb_id: &str) -> String {
        format!("{PROCESSING_BLOCK}/{pb_id}")
    }

    pub fn execution_block(eb_id: &str) -> String {
        format!("{EXECUTION_BLOCK}/{eb_id}")
    }

    pub fn script(key: &ScriptKey) -> String {
        format!("{SCRIPT}/{}:{}:{}", key.kind, key.name, key.version)
    }

    pub fn deployment(deploy_id: &str) -> String {
        format!("{DEPLOYMENT}/{deploy_id}")
    }
}
