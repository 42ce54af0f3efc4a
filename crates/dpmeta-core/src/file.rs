//! File handles bound to a persisted metadata document.
//!
//! A [`DataProductFile`] refers to its document by the document's on-disk
//! location, never by an in-memory borrow. Every status update reloads the
//! document, changes one record, and rewrites the whole file, so handles held
//! by different parts of a process (or different processes) observe each
//! other's updates. Concurrent writers race: the last rewrite wins.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::MetadataDocument;
use crate::errors::{MetadataError, MetadataResult};
use crate::model::FileStatus;
use crate::path::normalize_record_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataProductFile {
    path: String,
    metadata_path: PathBuf,
    full_path: PathBuf,
}

impl DataProductFile {
    pub(crate) fn new(path: String, metadata_path: PathBuf, full_path: PathBuf) -> Self {
        Self {
            path,
            metadata_path,
            full_path,
        }
    }

    /// Bind to a record of an existing document on disk.
    pub fn open(metadata_path: &Path, path: &str) -> MetadataResult<Self> {
        let doc = MetadataDocument::load(metadata_path)?;
        let path = normalize_record_path(path)?;
        if doc.data().file(&path).is_none() {
            return Err(MetadataError::not_found(format!(
                "no file with path {path} in {}",
                metadata_path.display()
            )));
        }
        let full_path = doc.runtime_abspath(&path);
        Ok(Self::new(path, metadata_path.to_path_buf(), full_path))
    }

    /// Normalized path of the record.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Location of the backing metadata document.
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Runtime location of the data product file itself.
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Reload the document, set this record's status, and rewrite it in place.
    pub fn update_status(&self, status: impl Into<FileStatus>) -> MetadataResult<()> {
        let status = status.into();
        let mut doc = MetadataDocument::load(&self.metadata_path)?;
        doc.set_file_status(&self.path, status.clone())?;
        doc.set_output_path(Some(self.metadata_path.clone()));
        doc.write()?;
        info!(path = %self.path, status = %status, "updated file status");
        Ok(())
    }

    /// Current status as recorded on disk.
    pub fn status(&self) -> MetadataResult<FileStatus> {
        let doc = MetadataDocument::load(&self.metadata_path)?;
        doc.data()
            .file(&self.path)
            .map(|r| r.status.clone())
            .ok_or_else(|| {
                MetadataError::not_found(format!("no file with path {} in metadata", self.path))
            })
    }
}
