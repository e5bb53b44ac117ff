//! Command-line interface

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use commands::migrate::MigrateCommands;
use commands::rows::RowsCommands;
use commands::sync::SyncCommands;

/// Sync schemas and rows between revisioned projects
#[derive(Parser, Debug)]
#[command(name = "revisync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Hide per-batch progress
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (defaults to $REVISYNC_CONFIG or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply or save migration histories
    #[command(subcommand)]
    Migrate(MigrateCommands),

    /// Upload rows from a folder or save them to one
    #[command(subcommand)]
    Rows(RowsCommands),

    /// Sync schema or data from one project to another
    #[command(subcommand)]
    Sync(SyncCommands),
}

/// Settings shared by every command handler
pub struct Context {
    pub config: Config,
    pub show_progress: bool,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = Context {
        config,
        show_progress: !cli.quiet,
    };

    match cli.command {
        Commands::Migrate(args) => commands::migrate::handle_migrate_command(args, &ctx).await,
        Commands::Rows(args) => commands::rows::handle_rows_command(args, &ctx).await,
        Commands::Sync(args) => commands::sync::handle_sync_command(args, &ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::rows::RowsCommands;
    use commands::sync::SyncCommands;

    #[test]
    fn test_parse_rows_upload() {
        let cli = Cli::try_parse_from([
            "revisync",
            "-vv",
            "rows",
            "upload",
            "--target",
            "staging",
            "--folder",
            "./data",
            "--tables",
            "abilities,quests",
            "--batch-size",
            "50",
            "--commit",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Rows(RowsCommands::Upload(args)) = cli.command else {
            panic!("expected rows upload");
        };
        assert_eq!(args.target, "staging");
        assert_eq!(args.tables.as_deref(), Some(&["abilities".to_string(), "quests".to_string()][..]));
        assert_eq!(args.batch.batch_size, Some(50));
        assert!(args.write.commit);
        assert!(!args.write.dry_run);
    }

    #[test]
    fn test_batch_size_must_be_positive() {
        let err = Cli::try_parse_from([
            "revisync",
            "sync",
            "data",
            "--source",
            "a",
            "--target",
            "b",
            "--batch-size",
            "0",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_parse_sync_schema_dry_run() {
        let cli = Cli::try_parse_from([
            "revisync", "sync", "schema", "--source", "a", "--target", "b", "--dry-run",
        ])
        .unwrap();
        let Commands::Sync(SyncCommands::Schema(args)) = cli.command else {
            panic!("expected sync schema");
        };
        assert!(args.write.dry_run);
    }

    #[test]
    fn test_migrate_apply_requires_file() {
        assert!(Cli::try_parse_from(["revisync", "migrate", "apply", "--target", "b"]).is_err());
    }
}
