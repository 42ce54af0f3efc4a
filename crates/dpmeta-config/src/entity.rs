//! Configuration database entities.
//!
//! Only the fields the metadata tooling reads are modelled strictly. Anything
//! else a record carries is kept in `extra` so a read-modify-write through this
//! crate never drops data written by other components.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Composite key identifying a processing script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScriptKey {
    /// Script kind, e.g. "realtime" or "batch".
    pub kind: String,
    pub name: String,
    pub version: String,
}

impl ScriptKey {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

/// A processing block: one pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingBlock {
    pub key: String,

    /// Execution block this processing block belongs to, if any.
    #[serde(default)]
    pub eb_id: Option<String>,

    pub script: ScriptKey,

    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,

    #[serde(default)]
    pub dependencies: Vec<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProcessingBlock {
    pub fn new(key: impl Into<String>, eb_id: Option<String>, script: ScriptKey) -> Self {
        Self {
            key: key.into(),
            eb_id,
            script,
            parameters: BTreeMap::new(),
            dependencies: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// An execution block: one observing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionBlock {
    pub key: String,

    /// Free-form observing context (observer, intent, notes).
    #[serde(default)]
    pub context: BTreeMap<String, Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ExecutionBlock {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            context: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, k: impl Into<String>, v: impl Into<Value>) -> Self {
        self.context.insert(k.into(), v.into());
        self
    }
}

/// A processing script definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub key: ScriptKey,

    /// Container image reference, possibly with a `:tag` suffix.
    pub image: String,

    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Script {
    pub fn new(key: ScriptKey, image: impl Into<String>) -> Self {
        Self {
            key,
            image: image.into(),
            parameters: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// A deployment started on behalf of a processing block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub key: String,

    /// Deployment kind, e.g. "helm".
    pub kind: String,

    #[serde(default)]
    pub args: BTreeMap<String, Value>,
}

impl Deployment {
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            args: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn processing_block_keeps_unknown_fields() {
        let v = json!({
            "key": "pb-test-20240101-00000",
            "eb_id": "eb-test-20240101-00000",
            "script": {"kind": "realtime", "name": "vis-receive", "version": "0.6.0"},
            "sbi_ids": ["sbi-1"]
        });
        let pb: ProcessingBlock = serde_json::from_value(v).unwrap();
        assert_eq!(pb.script.name, "vis-receive");
        assert!(pb.extra.contains_key("sbi_ids"));

        let back = serde_json::to_value(&pb).unwrap();
        assert_eq!(back["sbi_ids"], json!(["sbi-1"]));
    }

    #[test]
    fn processing_block_without_eb() {
        let v = json!({
            "key": "pb-1",
            "script": {"kind": "batch", "name": "test", "version": "1.0.0"}
        });
        let pb: ProcessingBlock = serde_json::from_value(v).unwrap();
        assert!(pb.eb_id.is_none());
    }
}
