//! `sync` commands

mod handler;

use clap::{Args, Subcommand};

use super::{BatchArgs, WriteArgs};

pub use handler::handle_sync_command;

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Replay the source's migrations onto the target draft
    Schema(SchemaArgs),

    /// Copy rows from the source into the target draft, parents first
    Data(DataArgs),
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Source connection (revisync:// URL or profile name)
    #[arg(long)]
    pub source: String,

    /// Target connection (revisync:// URL or profile name)
    #[arg(long)]
    pub target: String,

    #[command(flatten)]
    pub write: WriteArgs,
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Source connection (revisync:// URL or profile name)
    #[arg(long)]
    pub source: String,

    /// Target connection (revisync:// URL or profile name)
    #[arg(long)]
    pub target: String,

    /// Only these tables (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub tables: Option<Vec<String>>,

    #[command(flatten)]
    pub batch: BatchArgs,

    #[command(flatten)]
    pub write: WriteArgs,
}
