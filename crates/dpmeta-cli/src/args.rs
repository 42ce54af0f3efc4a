use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "dpmeta", version, about = "Data product metadata CLI")]
pub struct Cli {
    /// Emit JSON output on stdout and JSON log lines on stderr.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a metadata document and write it.
    ///
    /// Provenance comes from a processing block (--pb-id or SDP_PB_ID) unless
    /// an execution block id is given directly.
    Generate {
        /// Processing block id (default: SDP_PB_ID).
        #[arg(long)]
        pb_id: Option<String>,

        /// Execution block id to use instead of reading a processing block.
        #[arg(long, conflicts_with_all = ["pb_id", "mint_eb"])]
        eb_id: Option<String>,

        /// Mint a fresh execution block id instead of reading a processing block.
        #[arg(long, conflicts_with = "pb_id")]
        mint_eb: bool,

        /// Where the data product volume is mounted.
        #[arg(long)]
        mount: Option<PathBuf>,

        /// Start from this document instead of the built-in template.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Write here instead of the standard product location.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Add a file record to a metadata document.
    AddFile {
        /// Metadata document to update.
        metadata: PathBuf,

        /// Data product path, relative to the product directory.
        path: String,

        #[arg(long)]
        description: Option<String>,

        /// Checksum supplied by the producer.
        #[arg(long)]
        crc: Option<String>,
    },

    /// Set the status of a file record.
    UpdateStatus {
        metadata: PathBuf,
        path: String,
        /// New status, e.g. done or failed.
        status: String,
    },

    /// Check a metadata document against the schema.
    Validate { metadata: PathBuf },

    /// Fill ObsCore attributes of a document from MeasurementSet tables.
    Obscore {
        metadata: PathBuf,

        /// Table dump (YAML or JSON) of the MeasurementSet.
        #[arg(long)]
        tables: PathBuf,

        /// MeasurementSet directory, used for the on-disk size.
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
}
