use anyhow::Result;

use crate::args::{Cli, Command};

mod add_file;
mod generate;
mod obscore;
mod update_status;
mod validate;

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate {
            pb_id,
            eb_id,
            mint_eb,
            mount,
            input,
            output,
        } => generate::run(generate::Args {
            pb_id,
            eb_id,
            mint_eb,
            mount,
            input,
            output,
        }),
        Command::AddFile {
            metadata,
            path,
            description,
            crc,
        } => add_file::run(&metadata, &path, description.as_deref(), crc.as_deref()),
        Command::UpdateStatus {
            metadata,
            path,
            status,
        } => update_status::run(&metadata, &path, &status),
        Command::Validate { metadata } => validate::run(&metadata),
        Command::Obscore {
            metadata,
            tables,
            dataset,
        } => obscore::run(&metadata, &tables, dataset.as_deref()),
    }
}
