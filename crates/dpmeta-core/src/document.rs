//! The metadata document and its mutation protocol.
//!
//! A [`MetadataDocument`] is loaded from the built-in template or from an
//! existing file, populated with provenance from the configuration database,
//! extended with file records, and persisted as YAML after schema
//! validation.
//!
//! Storage layout: `{root}/product/{execution_block}/ska-sdp/{processing_block}/`
//! holds the data product files and the metadata document itself. The prefix
//! is derived from the document's own `execution_block` and
//! `config.processing_block`, so a document reloaded from disk resolves the
//! same locations as the one that wrote it.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use dpmeta_config::{ConfigClient, ExecutionBlock, ScriptKey};
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::errors::{MetadataError, MetadataResult};
use crate::file::DataProductFile;
use crate::layout;
use crate::model::{FileRecord, FileStatus, MetadataData, ObsCore};
use crate::path::{normalize_record_path, runtime_abspath};
use crate::schema::{SchemaValidator, Violation};
use crate::DEFAULT_METADATA_FILENAME;

/// Built-in defaults used when no source document is given.
pub const DEFAULT_TEMPLATE: &str = include_str!("../template/metadata_defaults.yaml");

const VALIDATION_FAILED: &str = "Error(s) occurred during validation.";

#[derive(Debug, Clone)]
pub struct MetadataDocument {
    data: MetadataData,
    /// Fallback processing block for [`Self::populate_from_processing_block`].
    default_pb_id: Option<String>,
    metadata_filename: String,
    root: PathBuf,
    output_path: Option<PathBuf>,
}

impl MetadataDocument {
    /// Construct(path?): load `path`, or the built-in template when `None`.
    pub fn new(path: Option<&Path>) -> MetadataResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::from_template(),
        }
    }

    pub fn from_template() -> MetadataResult<Self> {
        Self::from_yaml_str("built-in template", DEFAULT_TEMPLATE)
    }

    pub fn load(path: &Path) -> MetadataResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MetadataError::load(path.display().to_string(), e.to_string()))?;
        let doc = Self::from_yaml_str(&path.display().to_string(), &text)?;
        debug!(path = %path.display(), files = doc.data.files.len(), "loaded metadata document");
        Ok(doc)
    }

    /// Parse a document; `source_name` only labels errors.
    pub fn from_yaml_str(source_name: &str, text: &str) -> MetadataResult<Self> {
        let data: MetadataData = serde_yaml::from_str(text)
            .map_err(|e| MetadataError::load(source_name, e.to_string()))?;
        Ok(Self::from_data(data))
    }

    pub fn from_data(data: MetadataData) -> Self {
        Self {
            data,
            default_pb_id: None,
            metadata_filename: DEFAULT_METADATA_FILENAME.to_string(),
            root: PathBuf::from("/"),
            output_path: None,
        }
    }

    /// Apply process-level settings: fallback processing block, metadata file
    /// name and mount root.
    pub fn with_config(mut self, cfg: &RuntimeConfig) -> Self {
        self.default_pb_id = cfg.processing_block_id.clone();
        self.metadata_filename = cfg.metadata_filename.clone();
        self.root = cfg.mount_root.clone();
        self
    }

    pub fn data(&self) -> &MetadataData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut MetadataData {
        &mut self.data
    }

    pub fn obscore(&self) -> &ObsCore {
        &self.data.obscore
    }

    pub fn obscore_mut(&mut self) -> &mut ObsCore {
        &mut self.data.obscore
    }

    pub fn execution_block(&self) -> Option<&str> {
        self.data.execution_block.as_deref()
    }

    pub fn processing_block(&self) -> Option<&str> {
        self.data.config.processing_block.as_deref()
    }

    pub fn metadata_filename(&self) -> &str {
        &self.metadata_filename
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configure the document from a processing block in the configuration
    /// database.
    ///
    /// Steps run in order and stop at the first failure; whatever was set
    /// before the failure stays set.
    pub fn populate_from_processing_block(
        &mut self,
        client: &ConfigClient,
        pb_id: Option<&str>,
        mount_path: Option<&Path>,
    ) -> MetadataResult<()> {
        let pb_id = pb_id
            .map(str::to_string)
            .or_else(|| self.default_pb_id.clone())
            .ok_or(MetadataError::MissingIdentifier)?;
        info!(
            pb_id = %pb_id,
            backend = client.backend_name(),
            "populating metadata from processing block"
        );

        let (pb, eb, script) = client.txn(|txn| -> MetadataResult<_> {
            let pb = txn
                .processing_block(&pb_id)?
                .ok_or_else(|| MetadataError::not_found("Processing Block is None!"))?;

            let eb = match pb.eb_id.as_deref() {
                Some(eb_id) => {
                    info!(eb_id = %eb_id, "execution block");
                    let eb = txn
                        .execution_block(eb_id)?
                        .ok_or_else(|| MetadataError::not_found("Execution Block is None!"))?;
                    self.data.execution_block = Some(eb_id.to_string());
                    Some(eb)
                }
                None => None,
            };

            let key = ScriptKey::new(&pb.script.kind, &pb.script.name, &pb.script.version);
            let script = txn
                .script(&key)?
                .ok_or_else(|| MetadataError::not_found("Script is None!"))?;
            Ok((pb, eb, script))
        })?;

        if let Some(ExecutionBlock { context, .. }) = eb {
            self.data.context = context;
        }

        let config = &mut self.data.config;
        config.processing_block = Some(pb_id.clone());
        config.processing_script = Some(pb.script.name.clone());
        config.image = Some(strip_image_tag(&script.image).to_string());
        config.version = Some(pb.script.version.clone());

        if let Some(root) = mount_path {
            self.root = root.to_path_buf();
        }
        debug!(prefix = %self.prefix(), root = %self.root.display(), "storage prefix");
        Ok(())
    }

    /// Override the execution block id, e.g. with an externally minted unique id.
    pub fn set_execution_block_id(&mut self, eb_id: impl Into<String>) {
        self.data.execution_block = Some(eb_id.into());
    }

    /// Storage prefix below the mount root; empty when the document has no
    /// processing block.
    ///
    /// Without an execution block the segment is empty and collapses when the
    /// path is cleaned. Such a document fails schema validation, so it is
    /// never written there.
    pub fn prefix(&self) -> String {
        match self.processing_block() {
            Some(pb_id) => {
                layout::product_prefix(self.execution_block().unwrap_or_default(), pb_id)
            }
            None => String::new(),
        }
    }

    /// Absolute runtime location of `relative` below the storage prefix.
    pub fn runtime_abspath(&self, relative: &str) -> PathBuf {
        runtime_abspath(&self.root, &self.prefix(), relative)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Write to `path` instead of the computed location.
    pub fn set_output_path(&mut self, path: Option<PathBuf>) {
        self.output_path = path;
    }

    /// Where [`Self::write`] puts the document.
    pub fn resolved_output_path(&self) -> PathBuf {
        match &self.output_path {
            Some(p) => p.clone(),
            None => self.runtime_abspath(&self.metadata_filename),
        }
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.data.files
    }

    /// Look up a file record; `path` is normalized first.
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        let path = normalize_record_path(path).ok()?;
        self.data.file(&path)
    }

    /// Replace the in-memory file records with those of the written document.
    ///
    /// [`DataProductFile::update_status`] changes the document on disk only;
    /// this picks such changes up. No-op before the first write.
    pub fn reload_files(&mut self) -> MetadataResult<()> {
        let out = self.resolved_output_path();
        if !out.exists() {
            return Ok(());
        }
        let on_disk = Self::load(&out)?;
        self.data.files = on_disk.data.files;
        Ok(())
    }

    /// Append a file record in the `working` state and persist the document.
    ///
    /// File records are reloaded from the written document first, so status
    /// updates made through file handles are kept. On a write failure the
    /// file list is restored.
    pub fn add_file(
        &mut self,
        path: &str,
        description: Option<&str>,
        crc: Option<&str>,
    ) -> MetadataResult<DataProductFile> {
        let path = normalize_record_path(path)?;
        let previous = self.data.files.clone();
        self.reload_files()?;
        if self.data.file(&path).is_some() {
            return Err(MetadataError::DuplicatePath(path));
        }

        self.data.files.push(FileRecord::new(
            path.clone(),
            description.map(str::to_string),
            crc.map(str::to_string),
        ));

        match self.write() {
            Ok(written) => {
                info!(path = %path, metadata = %written.display(), "added file");
                let full_path = self.runtime_abspath(&path);
                Ok(DataProductFile::new(path, written, full_path))
            }
            Err(e) => {
                self.data.files = previous;
                Err(e)
            }
        }
    }

    /// Set a file's status in memory only.
    pub fn set_file_status(
        &mut self,
        path: &str,
        status: impl Into<FileStatus>,
    ) -> MetadataResult<()> {
        let path = normalize_record_path(path)?;
        let record = self
            .data
            .file_mut(&path)
            .ok_or_else(|| {
                MetadataError::not_found(format!("no file with path {path} in metadata"))
            })?;
        record.status = status.into();
        Ok(())
    }

    /// Check the document against the metadata schema.
    pub fn validate(&self) -> Vec<Violation> {
        let validator = match SchemaValidator::embedded() {
            Ok(v) => v,
            Err(e) => return vec![root_violation(e.to_string())],
        };
        match serde_json::to_value(&self.data) {
            Ok(instance) => validator.violations(&instance),
            Err(e) => vec![root_violation(format!("document is not representable as JSON: {e}"))],
        }
    }

    /// Render as YAML without validating.
    pub fn to_yaml(&self) -> MetadataResult<String> {
        serde_yaml::to_string(&self.data).map_err(|e| MetadataError::serialization(e.to_string()))
    }

    /// Validate and persist. Returns the path written.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// readers see either the old or the new document. An existing file keeps
    /// its permissions; a new one gets [`NEW_FILE_MODE`] on unix. File
    /// records are written as held in memory: call [`Self::reload_files`]
    /// first to keep status updates made through file handles.
    pub fn write(&self) -> MetadataResult<PathBuf> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(MetadataError::Validation {
                message: VALIDATION_FAILED.to_string(),
                errors,
            });
        }

        let out = self.resolved_output_path();
        let parent = match out.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| MetadataError::io(&parent, e))?;

        let text = self.to_yaml()?;
        let mut tmp =
            tempfile::NamedTempFile::new_in(&parent).map_err(|e| MetadataError::io(&parent, e))?;
        tmp.write_all(text.as_bytes()).map_err(|e| MetadataError::io(tmp.path(), e))?;
        carry_permissions(tmp.as_file(), &out).map_err(|e| MetadataError::io(tmp.path(), e))?;
        tmp.persist(&out).map_err(|e| MetadataError::io(&out, e.error))?;

        debug!(path = %out.display(), "wrote metadata document");
        Ok(out)
    }
}

/// Mode of a newly created metadata file (temporary files start at 0600).
pub const NEW_FILE_MODE: u32 = 0o644;

/// Give the temporary file the mode of the file it replaces, or
/// [`NEW_FILE_MODE`] when there is none.
#[cfg(unix)]
fn carry_permissions(tmp: &std::fs::File, out: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(out)
        .map(|m| m.permissions().mode() & 0o7777)
        .unwrap_or(NEW_FILE_MODE);
    tmp.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn carry_permissions(_tmp: &std::fs::File, _out: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Drop a trailing `:tag` from an image reference (everything from the first `:`).
pub fn strip_image_tag(image: &str) -> &str {
    image.split_once(':').map_or(image, |(name, _)| name)
}

fn root_violation(message: String) -> Violation {
    Violation {
        path: String::new(),
        message,
    }
}
