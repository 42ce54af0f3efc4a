//! Schema validation for metadata documents.
//!
//! Documents are checked against a JSON Schema (Draft 2020-12) definition
//! shipped inside the crate. Validation reports; it never fails on its own.
//! Callers decide what to do with the violations (`MetadataDocument::write`
//! refuses to persist a document that has any).

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::Value;

use crate::errors::{MetadataError, MetadataResult};

/// Raw schema text, as shipped.
pub const METADATA_SCHEMA: &str = include_str!("../schema/metadata.json");

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON pointer to the offending value (empty for the document root).
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "/: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A compiled Draft 2020-12 validator.
pub struct SchemaValidator {
    inner: jsonschema::Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

static EMBEDDED: OnceLock<Result<SchemaValidator, String>> = OnceLock::new();

impl SchemaValidator {
    /// Compile a schema given as a JSON value.
    pub fn from_value(schema: &Value) -> MetadataResult<Self> {
        let inner = jsonschema::draft202012::new(schema)
            .map_err(|e| MetadataError::load("metadata schema", e.to_string()))?;
        Ok(Self { inner })
    }

    /// Compile a schema given as JSON text.
    pub fn from_json(text: &str) -> MetadataResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| MetadataError::load("metadata schema", e.to_string()))?;
        Self::from_value(&value)
    }

    /// The shipped metadata schema, compiled once per process.
    pub fn embedded() -> MetadataResult<&'static SchemaValidator> {
        EMBEDDED
            .get_or_init(|| Self::from_json(METADATA_SCHEMA).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| MetadataError::load("embedded metadata schema", e.clone()))
    }

    /// Collect every violation of `instance`, in validator order.
    pub fn violations(&self, instance: &Value) -> Vec<Violation> {
        self.inner
            .iter_errors(instance)
            .map(|e| Violation {
                path: e.instance_path().to_string(),
                message: e.to_string(),
            })
            .collect()
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.inner.is_valid(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "interface": crate::DEFAULT_INTERFACE,
            "execution_block": "eb-test-20240101-00000",
            "context": {},
            "config": {
                "processing_block": null,
                "processing_script": null,
                "image": null,
                "version": null
            },
            "files": [],
            "obscore": {}
        })
    }

    #[test]
    fn embedded_schema_compiles() {
        SchemaValidator::embedded().unwrap();
    }

    #[test]
    fn minimal_document_is_valid() {
        let v = SchemaValidator::embedded().unwrap();
        assert!(v.violations(&minimal()).is_empty());
    }

    #[test]
    fn null_execution_block_is_reported() {
        let v = SchemaValidator::embedded().unwrap();
        let mut doc = minimal();
        doc["execution_block"] = Value::Null;
        let errs = v.violations(&doc);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "/execution_block");
    }

    #[test]
    fn bad_calib_level_is_reported() {
        let v = SchemaValidator::embedded().unwrap();
        let mut doc = minimal();
        doc["obscore"]["calib_level"] = json!(7);
        let errs = v.violations(&doc);
        assert!(errs.iter().any(|e| e.path == "/obscore/calib_level"));
    }

    #[test]
    fn file_without_status_is_reported() {
        let v = SchemaValidator::embedded().unwrap();
        let mut doc = minimal();
        doc["files"] = json!([{"path": "vis.ms"}]);
        assert!(!v.is_valid(&doc));
        assert!(!v.violations(&doc).is_empty());
    }

    #[test]
    fn broken_schema_is_load_error() {
        let r = SchemaValidator::from_json("{not json");
        assert!(matches!(r, Err(MetadataError::Load { .. })));
    }

    #[test]
    fn violation_display() {
        let v = Violation {
            path: String::new(),
            message: "\"execution_block\" is a required property".to_string(),
        };
        assert_eq!(v.to_string(), "/: \"execution_block\" is a required property");
    }
}
