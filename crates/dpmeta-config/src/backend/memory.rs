use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Backend;
use crate::error::ConfigResult;

/// In-process backend.
///
/// Clones share the same underlying map, so a test fixture can seed records
/// through one handle and the code under test reads them through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> ConfigResult<()> {
        self.inner.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> ConfigResult<bool> {
        Ok(self.inner.write().remove(key).is_some())
    }

    fn apply(&self, writes: &[(String, Option<String>)]) -> ConfigResult<()> {
        let mut map = self.inner.write();
        for (key, value) in writes {
            match value {
                Some(v) => map.insert(key.clone(), v.clone()),
                None => map.remove(key),
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.put("/pb/x", "{}").unwrap();
        assert_eq!(b.get("/pb/x").unwrap().as_deref(), Some("{}"));
        assert!(b.delete("/pb/x").unwrap());
        assert!(a.is_empty());
    }

    #[test]
    fn apply_writes_and_deletes_in_one_step() {
        let b = MemoryBackend::new();
        b.put("/script/old", "{}").unwrap();
        b.apply(&[
            ("/pb/x".to_string(), Some("{\"a\":1}".to_string())),
            ("/script/old".to_string(), None),
        ])
        .unwrap();
        assert_eq!(b.keys(), vec!["/pb/x"]);
    }
}
