//! Typed, transactional access to the configuration database.
//!
//! A transaction is a scoped closure. Reads go to the backend (or to writes
//! already staged in the same transaction). Writes are staged and committed
//! only when the closure returns `Ok`; an `Err` discards them.
//!
//! There is no conflict detection or retry: the closure runs exactly once.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::backend::{Backend, BackendKind, MemoryBackend};
use crate::entity::{Deployment, ExecutionBlock, ProcessingBlock, Script, ScriptKey};
use crate::error::{ConfigError, ConfigResult};
use crate::keys;

/// Handle to a configuration database.
pub struct ConfigClient {
    backend: Box<dyn Backend>,
}

/// Build a client for the selected backend (factory).
pub fn new_config_client(kind: &BackendKind) -> ConfigResult<ConfigClient> {
    info!(backend = kind.as_str(), "using config DB {kind} backend");
    match kind {
        BackendKind::Memory => Ok(ConfigClient::new(Box::new(MemoryBackend::new()))),
        #[cfg(feature = "etcd")]
        BackendKind::Etcd { host, port } => {
            let b = crate::backend::EtcdBackend::connect(host, *port)?;
            Ok(ConfigClient::new(Box::new(b)))
        }
        #[cfg(not(feature = "etcd"))]
        BackendKind::Etcd { .. } => Err(ConfigError::Unavailable(
            "etcd3 (built without the `etcd` feature)".to_string(),
        )),
    }
}

impl ConfigClient {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Client over a shared memory backend. Clones of `backend` see the same data.
    pub fn memory(backend: MemoryBackend) -> Self {
        Self::new(Box::new(backend))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run `f` inside a transaction and commit its staged writes on success.
    pub fn txn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Txn<'_>) -> Result<T, E>,
        E: From<ConfigError>,
    {
        let mut txn = Txn {
            backend: self.backend.as_ref(),
            staged: BTreeMap::new(),
        };
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }
}

/// An open transaction.
pub struct Txn<'a> {
    backend: &'a dyn Backend,
    /// Pending writes; `None` marks a delete.
    staged: BTreeMap<String, Option<String>>,
}

impl<'a> Txn<'a> {
    fn raw_get(&self, key: &str) -> ConfigResult<Option<String>> {
        match self.staged.get(key) {
            Some(v) => Ok(v.clone()),
            None => self.backend.get(key),
        }
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> ConfigResult<Option<T>> {
        match self.raw_get(key)? {
            Some(s) => {
                let v = serde_json::from_str(&s)
                    .map_err(|e| ConfigError::serialization(format!("{key}: {e}")))?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }

    fn create<T: Serialize>(&mut self, key: String, value: &T) -> ConfigResult<()> {
        if self.raw_get(&key)?.is_some() {
            return Err(ConfigError::AlreadyExists(key));
        }
        self.put(key, value)
    }

    fn put<T: Serialize>(&mut self, key: String, value: &T) -> ConfigResult<()> {
        let s = serde_json::to_string(value)?;
        self.staged.insert(key, Some(s));
        Ok(())
    }

    fn delete(&mut self, key: String) -> ConfigResult<()> {
        if self.raw_get(&key)?.is_none() {
            return Err(ConfigError::Missing(key));
        }
        self.staged.insert(key, None);
        Ok(())
    }

    fn commit(self) -> ConfigResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let writes: Vec<(String, Option<String>)> = self.staged.into_iter().collect();
        self.backend.apply(&writes)?;
        debug!(keys = writes.len(), "committed config transaction");
        Ok(())
    }

    pub fn processing_block(&self, pb_id: &str) -> ConfigResult<Option<ProcessingBlock>> {
        self.get(&keys::processing_block(pb_id))
    }

    pub fn create_processing_block(&mut self, pb: &ProcessingBlock) -> ConfigResult<()> {
        self.create(keys::processing_block(&pb.key), pb)
    }

    pub fn execution_block(&self, eb_id: &str) -> ConfigResult<Option<ExecutionBlock>> {
        self.get(&keys::execution_block(eb_id))
    }

    pub fn create_execution_block(&mut self, eb: &ExecutionBlock) -> ConfigResult<()> {
        self.create(keys::execution_block(&eb.key), eb)
    }

    pub fn script(&self, key: &ScriptKey) -> ConfigResult<Option<Script>> {
        self.get(&keys::script(key))
    }

    pub fn create_script(&mut self, script: &Script) -> ConfigResult<()> {
        self.create(keys::script(&script.key), script)
    }

    pub fn update_script(&mut self, script: &Script) -> ConfigResult<()> {
        let key = keys::script(&script.key);
        if self.raw_get(&key)?.is_none() {
            return Err(ConfigError::Missing(key));
        }
        self.put(key, script)
    }

    pub fn delete_script(&mut self, key: &ScriptKey) -> ConfigResult<()> {
        self.delete(keys::script(key))
    }

    pub fn deployment(&self, deploy_id: &str) -> ConfigResult<Option<Deployment>> {
        self.get(&keys::deployment(deploy_id))
    }

    pub fn create_deployment(&mut self, deployment: &Deployment) -> ConfigResult<()> {
        self.create(keys::deployment(&deployment.key), deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn script_key() -> ScriptKey {
        ScriptKey::new("realtime", "vis-receive", "0.6.0")
    }

    #[test]
    fn staged_writes_visible_inside_txn() {
        let client = ConfigClient::memory(MemoryBackend::new());
        client
            .txn(|txn| -> ConfigResult<()> {
                txn.create_script(&Script::new(script_key(), "img:1"))?;
                assert!(txn.script(&script_key())?.is_some());
                Ok(())
            })
            .unwrap();
        let s = client.txn(|txn| txn.script(&script_key())).unwrap();
        assert_eq!(s.unwrap().image, "img:1");
    }

    #[test]
    fn failed_txn_discards_writes() {
        let backend = MemoryBackend::new();
        let client = ConfigClient::memory(backend.clone());
        let r = client.txn(|txn| -> ConfigResult<()> {
            txn.create_deployment(&Deployment::new("proc-1", "helm"))?;
            Err(ConfigError::backend("boom"))
        });
        assert!(r.is_err());
        assert!(backend.is_empty());
    }

    #[test]
    fn create_twice_fails() {
        let client = ConfigClient::memory(MemoryBackend::new());
        let eb = ExecutionBlock::new("eb-1");
        client.txn(|txn| txn.create_execution_block(&eb)).unwrap();
        let r = client.txn(|txn| txn.create_execution_block(&eb));
        assert_matches!(r, Err(ConfigError::AlreadyExists(k)) if k == "/eb/eb-1");
    }

    #[test]
    fn delete_missing_script_fails() {
        let client = ConfigClient::memory(MemoryBackend::new());
        let r = client.txn(|txn| txn.delete_script(&script_key()));
        assert_matches!(r, Err(ConfigError::Missing(_)));
    }

    #[test]
    fn corrupt_record_is_serialization_error() {
        let backend = MemoryBackend::new();
        backend.put("/pb/pb-1", "not json").unwrap();
        let client = ConfigClient::memory(backend);
        let r = client.txn(|txn| txn.processing_block("pb-1"));
        assert_matches!(r, Err(ConfigError::Serialization(_)));
    }

    #[test]
    fn factory_builds_memory_client() {
        let c = new_config_client(&BackendKind::Memory).unwrap();
        assert_eq!(c.backend_name(), "memory");
    }
}
