//! Metadata document model.
//!
//! Strongly typed view of the YAML document. Fields the tooling does not know
//! about are kept in `extra` maps so a load/write cycle never drops them.
//!
//! Layout on disk:
//! - `interface`: schema version URI
//! - `execution_block`: observing session id (required before a write)
//! - `context`: free-form map copied from the execution block
//! - `config`: provenance of the generating process
//! - `files`: ordered file manifest
//! - `obscore`: observational attributes, see [`obscore`]

pub mod obscore;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use obscore::ObsCore;

use crate::DEFAULT_INTERFACE;

/// Top-level document data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataData {
    pub interface: String,

    /// Serialized as `null` until set, which fails validation.
    #[serde(default)]
    pub execution_block: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub context: BTreeMap<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ProvenanceConfig,

    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileRecord>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub obscore: ObsCore,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for MetadataData {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            execution_block: None,
            context: BTreeMap::new(),
            config: ProvenanceConfig::default(),
            files: Vec::new(),
            obscore: ObsCore::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl MetadataData {
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn file_mut(&mut self, path: &str) -> Option<&mut FileRecord> {
        self.files.iter_mut().find(|f| f.path == path)
    }
}

/// Provenance of the process that generated the data product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    #[serde(default)]
    pub processing_block: Option<String>,
    #[serde(default)]
    pub processing_script: Option<String>,
    /// Container image without its tag.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub cmdline: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One entry of the file manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Normalized path relative to the product directory.
    pub path: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Supplied by the producer, never computed here.
    #[serde(default)]
    pub crc: Option<String>,
    pub status: FileStatus,
}

impl FileRecord {
    /// A fresh record, always in the `working` state.
    pub fn new(path: impl Into<String>, description: Option<String>, crc: Option<String>) -> Self {
        Self {
            path: path.into(),
            description,
            crc,
            status: FileStatus::Working,
        }
    }
}

/// Processing status of a file.
///
/// Conventional values have variants; any other string round-trips through
/// `Other`. There is no enforced transition table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileStatus {
    Working,
    Done,
    Failed,
    Other(String),
}

impl FileStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Working => "working",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for FileStatus {
    fn from(s: &str) -> Self {
        match s {
            "working" => Self::Working,
            "done" => Self::Done,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for FileStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<FileStatus> for String {
    fn from(s: FileStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for s in ["working", "done", "failed", "archived"] {
            assert_eq!(FileStatus::from(s).as_str(), s);
        }
        assert_eq!(FileStatus::from("archived"), FileStatus::Other("archived".to_string()));
    }

    #[test]
    fn new_record_is_working() {
        let r = FileRecord::new("vis.ms", Some("raw visibilities".to_string()), None);
        assert_eq!(r.status, FileStatus::Working);
    }

    #[test]
    fn null_sections_load_as_empty() {
        let yaml = "interface: x\nexecution_block: null\ncontext: null\nfiles: null\n";
        let data: MetadataData = serde_yaml::from_str(yaml).unwrap();
        assert!(data.context.is_empty());
        assert!(data.files.is_empty());
        assert!(data.execution_block.is_none());
    }

    #[test]
    fn unknown_keys_survive() {
        let yaml = "interface: x\nexecution_block: eb-1\nnotes: keep me\n\
                    config:\n  image: img\n  build: 42\n";
        let data: MetadataData = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(data.extra["notes"], Value::from("keep me"));
        assert_eq!(data.config.extra["build"], Value::from(42));

        let back = serde_yaml::to_string(&data).unwrap();
        assert!(back.contains("notes: keep me"));
        assert!(back.contains("build: 42"));
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let r = FileRecord::new("a", None, None);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], Value::from("working"));
        assert_eq!(v["crc"], Value::Null);
    }
}
