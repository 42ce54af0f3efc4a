//! Filling a metadata document from a MeasurementSet.

use std::path::Path;

use dpmeta_core::model::obscore::{
    AccessFormat, CalibrationLevel, DataProductType, ObservationCollection, Ucd,
};
use dpmeta_core::{MetadataDocument, MetadataError, MetadataResult};
use tracing::info;
use walkdir::WalkDir;

use crate::extract::{extract, Extraction};
use crate::table::TableSource;

/// Set the fixed MeasurementSet attributes on `doc`, then merge everything
/// extracted from `source`.
///
/// `access_estsize` is only set when the source has an on-disk location.
pub fn apply_measurement_set(
    doc: &mut MetadataDocument,
    source: &dyn TableSource,
) -> MetadataResult<Extraction> {
    let estsize = source.location().map(dir_size_kib).transpose()?;

    let mut extraction = extract(source)?;

    let obscore = doc.obscore_mut();
    obscore.dataproduct_type = Some(DataProductType::Ms.into());
    obscore.calib_level = Some(CalibrationLevel::Level0);
    obscore.obs_collection = Some(ObservationCollection::Unknown.into());
    obscore.o_ucd = Some(Ucd::Fourier.into());
    obscore.access_format = Some(AccessFormat::Unknown.into());
    if estsize.is_some() {
        obscore.access_estsize = estsize;
    }
    extraction.merge_into(obscore);

    info!(
        dataset = source.name(),
        attributes = extraction.attrs.len(),
        warnings = extraction.warnings.len(),
        "applied measurement set attributes"
    );
    Ok(extraction)
}

/// Total size of the regular files below `path`, in whole KiB.
pub fn dir_size_kib(path: &Path) -> MetadataResult<u64> {
    let mut total: u64 = 0;
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| MetadataError::io(path, e.into()))?;
        if entry.file_type().is_file() {
            let meta = entry.metadata().map_err(|e| MetadataError::io(entry.path(), e.into()))?;
            total += meta.len();
        }
    }
    Ok(total / 1024)
}
