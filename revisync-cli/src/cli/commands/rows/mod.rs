//! `rows` commands

mod handler;

use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::{BatchArgs, WriteArgs};

pub use handler::handle_rows_command;

#[derive(Subcommand, Debug)]
pub enum RowsCommands {
    /// Upload rows from <folder>/<table>/<row>.json into the target draft
    Upload(UploadArgs),

    /// Save the rows of a project to <folder>/<table>/<row>.json
    Save(SaveArgs),
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Target connection (revisync:// URL or profile name)
    #[arg(long)]
    pub target: String,

    /// Folder with one directory per table
    #[arg(long)]
    pub folder: PathBuf,

    /// Only these tables (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub tables: Option<Vec<String>>,

    /// Check rows against the target table schemas before uploading
    #[arg(long)]
    pub validate: bool,

    #[command(flatten)]
    pub batch: BatchArgs,

    #[command(flatten)]
    pub write: WriteArgs,
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Source connection (revisync:// URL or profile name)
    #[arg(long)]
    pub source: String,

    /// Output folder
    #[arg(long)]
    pub folder: PathBuf,

    /// Only these tables (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub tables: Option<Vec<String>>,
}
