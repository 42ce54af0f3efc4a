use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use dpmeta_core::MetadataDocument;

use crate::output;

#[derive(Debug, Serialize)]
pub struct AddFileOut {
    pub path: String,
    pub status: String,
    pub metadata: PathBuf,
    pub full_path: PathBuf,
}

pub fn run(
    metadata: &Path,
    path: &str,
    description: Option<&str>,
    crc: Option<&str>,
) -> Result<()> {
    let mut doc = MetadataDocument::load(metadata)?;
    doc.set_output_path(Some(metadata.to_path_buf()));

    let file = doc.add_file(path, description, crc)?;
    let status = file.status()?;

    let out = AddFileOut {
        path: file.path().to_string(),
        status: status.to_string(),
        metadata: file.metadata_path().to_path_buf(),
        full_path: file.full_path().to_path_buf(),
    };
    output::print(&out, &format!("added {} ({})", out.path, out.status))
}
