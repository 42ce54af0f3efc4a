use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use dpmeta_config::new_config_client;
use dpmeta_core::config::RuntimeConfig;
use dpmeta_core::MetadataDocument;

use crate::output;

pub struct Args {
    pub pb_id: Option<String>,
    pub eb_id: Option<String>,
    pub mint_eb: bool,
    pub mount: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct GenerateOut {
    pub path: PathBuf,
    pub execution_block: Option<String>,
    pub processing_block: Option<String>,
}

pub fn run(args: Args) -> Result<()> {
    let mut cfg = RuntimeConfig::from_lookup(|k| std::env::var(k).ok(), true)?;
    if let Some(mount) = &args.mount {
        cfg = cfg.with_mount_root(mount);
    }

    let mut doc = MetadataDocument::new(args.input.as_deref())?.with_config(&cfg);

    if let Some(eb_id) = args.eb_id {
        doc.set_execution_block_id(eb_id);
    } else if args.mint_eb {
        let eb_id = format!("eb-{}", Uuid::new_v4().simple());
        info!(eb_id = %eb_id, "minted execution block id");
        doc.set_execution_block_id(eb_id);
    } else {
        let client = new_config_client(&cfg.config_backend)?;
        doc.populate_from_processing_block(&client, args.pb_id.as_deref(), None)?;
    }

    doc.set_output_path(args.output);
    let path = doc.write()?;

    let out = GenerateOut {
        path,
        execution_block: doc.execution_block().map(str::to_string),
        processing_block: doc.processing_block().map(str::to_string),
    };
    output::print(&out, &format!("wrote {}", out.path.display()))
}
