//! dpmeta-core
//!
//! Core primitives for data product metadata:
//! - the metadata document model (provenance, file manifest, ObsCore attributes)
//! - population of provenance from the configuration database
//! - file records with status tracking on the shared on-disk document
//! - JSON Schema (Draft 2020-12) validation before every write
//! - path normalization for file records
//!
//! The YAML file on disk is the durable form of a document. A document is
//! single-writer: status updates reload, mutate, and rewrite the whole file,
//! so two processes updating the same document race.

pub mod config;
pub mod document;
pub mod errors;
pub mod file;
pub mod model;
pub mod path;
pub mod schema;

pub use crate::document::MetadataDocument;
pub use crate::errors::{MetadataError, MetadataResult};
pub use crate::file::DataProductFile;

/// Interface URI written into new documents.
pub const DEFAULT_INTERFACE: &str = "http://schema.skao.int/ska-data-product-meta/0.1";

/// File name of the metadata document inside a product directory.
pub const DEFAULT_METADATA_FILENAME: &str = "ska-data-product.yaml";

/// Storage layout of data products below the mount root.
pub mod layout {
    /// Directory holding all products.
    pub const PRODUCT_DIR: &str = "product";
    /// Subsystem directory below the execution block.
    pub const SUBSYSTEM_DIR: &str = "ska-sdp";

    /// `/product/{eb_id}/ska-sdp/{pb_id}`
    pub fn product_prefix(eb_id: &str, pb_id: &str) -> String {
        format!("/{PRODUCT_DIR}/{eb_id}/{SUBSYSTEM_DIR}/{pb_id}")
    }
}

/// Convenience re-exports.
pub mod prelude {
    pub use crate::config::{validate_config, RuntimeConfig};
    pub use crate::document::MetadataDocument;
    pub use crate::file::DataProductFile;
    pub use crate::model::obscore::{
        AccessFormat, AntennaDiameter, CalibrationLevel, DataProductType, ObsCore,
        ObservationCollection, Ucd,
    };
    pub use crate::model::{FileRecord, FileStatus, MetadataData, ProvenanceConfig};
    pub use crate::schema::{SchemaValidator, Violation};
    pub use crate::{MetadataError, MetadataResult};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_prefix_layout() {
        assert_eq!(
            layout::product_prefix("eb-1", "pb-1"),
            "/product/eb-1/ska-sdp/pb-1"
        );
    }
}
