//! dpmeta-ms
//!
//! ObsCore attribute extraction for MeasurementSet data products:
//! - [`table`]: read-only table access (`Table`, `TableSource`) and an
//!   in-memory implementation loadable from a YAML/JSON table dump
//! - [`extract`]: per-sub-table extraction into an intermediate dictionary and
//!   the lookup-with-default merge into an `ObsCore` record
//! - [`apply`]: fixed MeasurementSet attributes plus the merge, applied to a
//!   `MetadataDocument`
//!
//! Missing sub-tables and missing values are warnings, never errors.

pub mod apply;
pub mod extract;
pub mod table;

pub use crate::apply::{apply_measurement_set, dir_size_kib};
pub use crate::extract::{
    check_diameter, extract, seconds_to_mjd, stokes_polarisations, Attr, Extraction,
};
pub use crate::table::{
    Cell, MemoryTable, MemoryTableSet, Table, TableError, TableResult, TableSource,
};

impl From<TableError> for dpmeta_core::MetadataError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::Load { source_name, reason } => {
                dpmeta_core::MetadataError::load(source_name, reason)
            }
            other => dpmeta_core::MetadataError::load("measurement set", other.to_string()),
        }
    }
}
