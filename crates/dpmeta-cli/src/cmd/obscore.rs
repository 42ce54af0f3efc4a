use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use dpmeta_core::model::ObsCore;
use dpmeta_core::MetadataDocument;
use dpmeta_ms::{apply_measurement_set, MemoryTableSet, TableSource};

use crate::output;

#[derive(Debug, Serialize)]
pub struct ObscoreOut {
    pub metadata: PathBuf,
    pub dataset: String,
    pub warnings: Vec<String>,
    pub obscore: ObsCore,
}

pub fn run(metadata: &Path, tables: &Path, dataset: Option<&Path>) -> Result<()> {
    let mut doc = MetadataDocument::load(metadata)?;
    doc.set_output_path(Some(metadata.to_path_buf()));

    let mut set = MemoryTableSet::load(tables)?;
    if let Some(dir) = dataset {
        set = set.with_location(dir);
    }

    let extraction = apply_measurement_set(&mut doc, &set)?;
    doc.write()?;

    let out = ObscoreOut {
        metadata: metadata.to_path_buf(),
        dataset: set.name().to_string(),
        warnings: extraction.warnings,
        obscore: doc.obscore().clone(),
    };
    output::print(
        &out,
        &format!("updated obscore of {} from {}", out.metadata.display(), out.dataset),
    )
}
