//! document_flow.rs
//!
//! End-to-end behaviour of metadata documents against an in-memory
//! configuration database and a temporary product volume.

use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use dpmeta_config::{
    ConfigClient, ExecutionBlock, MemoryBackend, ProcessingBlock, Script, ScriptKey,
};
use dpmeta_core::prelude::*;

const PB_ID: &str = "pb-test-20240101-00000";
const EB_ID: &str = "eb-test-20240101-00000";

fn script_key() -> ScriptKey {
    ScriptKey::new("realtime", "vis-receive", "0.6.0")
}

fn seeded_client() -> (MemoryBackend, ConfigClient) {
    let backend = MemoryBackend::new();
    let client = ConfigClient::memory(backend.clone());
    client
        .txn(|txn| -> dpmeta_config::ConfigResult<()> {
            txn.create_script(&Script::new(
                script_key(),
                "artefact.skao.int/ska-sdp-script-vis-receive:0.6.0",
            ))?;
            txn.create_execution_block(
                &ExecutionBlock::new(EB_ID)
                    .with_context("observer", "AIV person 1")
                    .with_context("intent", "Experimental run"),
            )?;
            txn.create_processing_block(&ProcessingBlock::new(
                PB_ID,
                Some(EB_ID.to_string()),
                script_key(),
            ))?;
            Ok(())
        })
        .unwrap();
    (backend, client)
}

fn populated(root: &Path) -> MetadataDocument {
    let (_, client) = seeded_client();
    let mut doc = MetadataDocument::from_template().unwrap();
    doc.populate_from_processing_block(&client, Some(PB_ID), Some(root)).unwrap();
    doc
}

#[test]
fn populate_fills_provenance_and_location() {
    let dir = tempfile::tempdir().unwrap();
    let doc = populated(dir.path());

    assert_eq!(doc.execution_block(), Some(EB_ID));
    let cfg = &doc.data().config;
    assert_eq!(cfg.processing_block.as_deref(), Some(PB_ID));
    assert_eq!(cfg.processing_script.as_deref(), Some("vis-receive"));
    assert_eq!(cfg.image.as_deref(), Some("artefact.skao.int/ska-sdp-script-vis-receive"));
    assert_eq!(cfg.version.as_deref(), Some("0.6.0"));
    assert_eq!(doc.data().context["observer"], "AIV person 1");

    assert_eq!(
        doc.resolved_output_path(),
        dir.path()
            .join("product")
            .join(EB_ID)
            .join("ska-sdp")
            .join(PB_ID)
            .join("ska-data-product.yaml")
    );
}

#[test]
fn pb_id_falls_back_to_runtime_config() {
    let (_, client) = seeded_client();
    let cfg = RuntimeConfig::default().with_processing_block(PB_ID);
    let mut doc = MetadataDocument::from_template().unwrap().with_config(&cfg);
    doc.populate_from_processing_block(&client, None, None).unwrap();
    assert_eq!(doc.processing_block(), Some(PB_ID));
}

#[test]
fn missing_pb_id_is_reported() {
    let (_, client) = seeded_client();
    let mut doc = MetadataDocument::from_template().unwrap();
    let r = doc.populate_from_processing_block(&client, None, None);
    assert_matches!(r, Err(MetadataError::MissingIdentifier));
}

#[test]
fn unknown_processing_block_is_not_found() {
    let (_, client) = seeded_client();
    let mut doc = MetadataDocument::from_template().unwrap();
    let r = doc.populate_from_processing_block(&client, Some("pb-missing"), None);
    assert_matches!(r, Err(MetadataError::NotFound(m)) if m == "Processing Block is None!");
}

#[test]
fn deleted_script_is_not_found() {
    let (_, client) = seeded_client();
    client.txn(|txn| txn.delete_script(&script_key())).unwrap();

    let mut doc = MetadataDocument::from_template().unwrap();
    let r = doc.populate_from_processing_block(&client, Some(PB_ID), None);
    assert_matches!(r, Err(MetadataError::NotFound(m)) if m == "Script is None!");
    // no rollback: the execution block was already applied
    assert_eq!(doc.execution_block(), Some(EB_ID));
}

#[test]
fn dangling_execution_block_is_not_found() {
    let (_, client) = seeded_client();
    client
        .txn(|txn| {
            txn.create_processing_block(&ProcessingBlock::new(
                "pb-2",
                Some("eb-gone".to_string()),
                script_key(),
            ))
        })
        .unwrap();
    let mut doc = MetadataDocument::from_template().unwrap();
    let r = doc.populate_from_processing_block(&client, Some("pb-2"), None);
    assert_matches!(r, Err(MetadataError::NotFound(m)) if m == "Execution Block is None!");
}

#[test]
fn add_file_writes_document() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());

    let f = doc.add_file("vis.ms", Some("raw visibilities"), None).unwrap();
    assert_eq!(f.path(), "vis.ms");
    assert_eq!(f.metadata_path(), doc.resolved_output_path());
    assert!(f.metadata_path().exists());
    assert_eq!(f.full_path(), doc.runtime_abspath("vis.ms"));

    let reloaded = MetadataDocument::load(f.metadata_path()).unwrap();
    let rec = reloaded.file("vis.ms").unwrap();
    assert_eq!(rec.status, FileStatus::Working);
    assert_eq!(rec.description.as_deref(), Some("raw visibilities"));
}

#[test]
fn duplicate_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    doc.add_file("out/vis.ms", None, None).unwrap();

    let r = doc.add_file("out/./vis.ms", None, Some("0xdeadbeef"));
    assert_matches!(r, Err(MetadataError::DuplicatePath(p)) if p == "out/vis.ms");
    assert_eq!(doc.files().len(), 1);
}

#[test]
fn similar_but_distinct_paths_are_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    doc.add_file("vis.ms", None, None).unwrap();
    doc.add_file("vis.ms.flags", None, None).unwrap();
    doc.add_file("Vis.ms", None, None).unwrap();
    assert_eq!(doc.files().len(), 3);
}

#[test]
fn write_without_execution_block_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("meta.yaml");
    let mut doc = MetadataDocument::from_template().unwrap();
    doc.set_output_path(Some(out.clone()));

    let err = doc.write().unwrap_err();
    assert_matches!(err, MetadataError::Validation { .. });
    assert!(err.violations().iter().any(|v| v.path == "/execution_block"));
    assert!(!out.exists());
}

#[test]
fn failed_add_file_leaves_document_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = MetadataDocument::from_template().unwrap();
    doc.set_output_path(Some(dir.path().join("meta.yaml")));

    let r = doc.add_file("vis.ms", None, None);
    assert_matches!(r, Err(MetadataError::Validation { .. }));
    assert!(doc.files().is_empty());
}

#[test]
fn custom_output_path_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    let custom = dir.path().join("elsewhere").join("custom.yaml");
    doc.set_output_path(Some(custom.clone()));

    let written = doc.write().unwrap();
    assert_eq!(written, custom);
    assert!(custom.exists());
    assert!(!doc.runtime_abspath("ska-data-product.yaml").exists());
}

#[test]
fn write_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    doc.add_file("vis.ms", Some("raw visibilities"), Some("1234")).unwrap();
    {
        let ob = doc.obscore_mut();
        ob.s_ra = Some(83.6331);
        ob.instrument_ant_diameter = Some(AntennaDiameter::various());
        ob.calib_level = Some(CalibrationLevel::Level1);
    }
    let path = doc.write().unwrap();

    let back = MetadataDocument::load(&path).unwrap();
    assert_eq!(back.data(), doc.data());
}

#[test]
fn update_status_touches_only_target() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    let a = doc.add_file("a.ms", Some("first"), None).unwrap();
    let _b = doc.add_file("b.ms", Some("second"), None).unwrap();
    let before = MetadataDocument::load(a.metadata_path()).unwrap();

    a.update_status(FileStatus::Done).unwrap();

    let after = MetadataDocument::load(a.metadata_path()).unwrap();
    assert_eq!(after.file("a.ms").unwrap().status, FileStatus::Done);

    let mut expected = before.data().clone();
    expected.file_mut("a.ms").unwrap().status = FileStatus::Done;
    assert_eq!(after.data(), &expected);
}

#[test]
fn handles_share_the_backing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    let a = doc.add_file("a.ms", None, None).unwrap();
    let b = doc.add_file("b.ms", None, None).unwrap();

    a.update_status("done").unwrap();
    b.update_status("failed").unwrap();

    assert_eq!(a.status().unwrap(), FileStatus::Done);
    assert_eq!(b.status().unwrap(), FileStatus::Failed);

    let reopened = DataProductFile::open(a.metadata_path(), "./a.ms").unwrap();
    assert_eq!(reopened.path(), a.path());
    assert_eq!(reopened.status().unwrap(), FileStatus::Done);
}

#[test]
fn add_file_keeps_status_set_through_handle() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    let a = doc.add_file("a.ms", None, None).unwrap();
    a.update_status("done").unwrap();

    let b = doc.add_file("b.ms", None, None).unwrap();
    assert_eq!(a.status().unwrap(), FileStatus::Done);
    assert_eq!(b.status().unwrap(), FileStatus::Working);
    assert_eq!(doc.file("a.ms").unwrap().status, FileStatus::Done);

    // handle updates also reach the document's own file records
    b.update_status("failed").unwrap();
    doc.reload_files().unwrap();
    doc.write().unwrap();
    assert_eq!(b.status().unwrap(), FileStatus::Failed);
    assert_eq!(a.status().unwrap(), FileStatus::Done);
}

#[test]
fn add_file_rejects_path_only_present_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    let a = doc.add_file("a.ms", None, None).unwrap();

    let mut other = MetadataDocument::load(a.metadata_path()).unwrap();
    other.set_output_path(Some(a.metadata_path().to_path_buf()));
    other.add_file("b.ms", None, None).unwrap();

    let r = doc.add_file("b.ms", None, None);
    assert_matches!(r, Err(MetadataError::DuplicatePath(p)) if p == "b.ms");
    assert_eq!(doc.files().len(), 2);
}

#[cfg(unix)]
#[test]
fn written_document_is_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let doc = populated(dir.path());
    let path = doc.write().unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, dpmeta_core::document::NEW_FILE_MODE);
}

#[cfg(unix)]
#[test]
fn rewrite_keeps_existing_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    let a = doc.add_file("a.ms", None, None).unwrap();
    fs::set_permissions(a.metadata_path(), fs::Permissions::from_mode(0o664)).unwrap();

    a.update_status("done").unwrap();
    let mode = fs::metadata(a.metadata_path()).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o664);
}

#[test]
fn open_unknown_record_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = populated(dir.path());
    let a = doc.add_file("a.ms", None, None).unwrap();
    let r = DataProductFile::open(a.metadata_path(), "zzz.ms");
    assert_matches!(r, Err(MetadataError::NotFound(_)));
}

#[test]
fn written_yaml_keeps_nulls() {
    let dir = tempfile::tempdir().unwrap();
    let doc = populated(dir.path());
    let path = doc.write().unwrap();
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("interface: http://schema.skao.int/ska-data-product-meta/0.1"));
    assert!(text.contains("s_ra: null"));
}
