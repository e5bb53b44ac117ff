//! `migrate` commands

mod handler;

use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::WriteArgs;

pub use handler::handle_migrate_command;

#[derive(Subcommand, Debug)]
pub enum MigrateCommands {
    /// Apply a migrations file to the target draft, skipping ones already applied
    Apply(ApplyArgs),

    /// Save the migration history of a project to a file
    Save(SaveArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Target connection (revisync:// URL or profile name)
    #[arg(long)]
    pub target: String,

    /// JSON file with the migrations to apply
    #[arg(long)]
    pub file: PathBuf,

    #[command(flatten)]
    pub write: WriteArgs,
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Source connection (revisync:// URL or profile name)
    #[arg(long)]
    pub source: String,

    /// Output file
    #[arg(long)]
    pub file: PathBuf,
}
