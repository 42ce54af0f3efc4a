use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use dpmeta_core::DataProductFile;

use crate::output;

#[derive(Debug, Serialize)]
pub struct UpdateStatusOut {
    pub path: String,
    pub status: String,
    pub metadata: PathBuf,
}

pub fn run(metadata: &Path, path: &str, status: &str) -> Result<()> {
    let file = DataProductFile::open(metadata, path)?;
    file.update_status(status)?;

    let out = UpdateStatusOut {
        path: file.path().to_string(),
        status: file.status()?.to_string(),
        metadata: metadata.to_path_buf(),
    };
    output::print(&out, &format!("{} -> {}", out.path, out.status))
}
