//! Command definitions and handlers

pub mod migrate;
pub mod rows;
pub mod sync;

use anyhow::Result;
use clap::Args;
use colored::*;
use log::{info, warn};

use super::Context;
use super::output::{
    print_commit_outcome, print_migration_summary, print_progress, print_run_summary,
    print_sync_failure,
};
use crate::api::{Connection, DEFAULT_PAGE_SIZE};
use crate::config::{ConnectionConfig, ConnectionRole, open_connection};
use crate::sync::{
    DataSyncError, DataSyncOptions, MigrationError, MigrationStats, ProgressFn, RowSource,
    RunStats, commit_if_needed, sync_data,
};

/// Flags of commands that write to a draft
#[derive(Args, Debug, Clone, Default)]
pub struct WriteArgs {
    /// Create a revision from the draft when something changed
    #[arg(long)]
    pub commit: bool,

    /// Compute and report changes without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BatchArgs {
    /// Rows per create/update call (defaults to the configured batch size)
    #[arg(long, value_parser = parse_batch_size)]
    pub batch_size: Option<usize>,
}

impl BatchArgs {
    pub fn resolve(&self, ctx: &Context) -> usize {
        self.batch_size.unwrap_or(ctx.config.defaults.batch_size)
    }
}

fn parse_batch_size(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a number", value)),
    }
}

/// Resolve and open a `--source` / `--target` connection
pub async fn connect(arg: &str, ctx: &Context, role: ConnectionRole) -> Result<Connection> {
    let resolved = ConnectionConfig::resolve(arg, &ctx.config, role, |key| std::env::var(key).ok())?;
    if resolved.token.is_none() {
        warn!("No token for the {} connection; requests are unauthenticated", role.label());
    }
    info!("Connecting to {} {} ({})", role.label(), resolved.project, resolved.endpoint);
    open_connection(&resolved, DEFAULT_PAGE_SIZE).await
}

const TERMINAL_PROGRESS: &ProgressFn = &print_progress;

pub fn progress(ctx: &Context) -> Option<&'static ProgressFn> {
    if ctx.show_progress {
        Some(TERMINAL_PROGRESS)
    } else {
        None
    }
}

/// Run a data sync and print its summary
///
/// On a table failure the partial summary and the operator hint are printed
/// before the error is returned.
pub async fn run_data_sync(
    source: &dyn RowSource,
    target: &Connection,
    options: &DataSyncOptions,
    ctx: &Context,
    title: &str,
) -> Result<RunStats> {
    match sync_data(source, target, options, progress(ctx)).await {
        Ok(run) => {
            print_run_summary(title, &run, options.sync.dry_run);
            Ok(run)
        }
        Err(DataSyncError::Table { error, stats }) => {
            print_run_summary(title, &stats, options.sync.dry_run);
            print_sync_failure(&error);
            Err(error.into())
        }
        Err(DataSyncError::Other(err)) => Err(err),
    }
}

/// Print the summary of a migration replay, including a failed one
pub fn report_migrations(
    result: std::result::Result<MigrationStats, MigrationError>,
    dry_run: bool,
) -> Result<MigrationStats> {
    match result {
        Ok(stats) => {
            print_migration_summary(&stats, dry_run);
            Ok(stats)
        }
        Err(MigrationError::Replay { error, stats }) => {
            print_migration_summary(&stats, dry_run);
            Err(error)
        }
        Err(MigrationError::Other(err)) => Err(err),
    }
}

/// Commit (or leave in draft) after a write command and report the outcome
pub async fn finish(
    target: &Connection,
    write: &WriteArgs,
    action_label: &str,
    change_count: usize,
) -> Result<()> {
    if write.dry_run {
        if write.commit {
            warn!("--commit has no effect together with --dry-run");
        }
        println!("{}", "Dry run: no changes were written".yellow());
        return Ok(());
    }

    let outcome = commit_if_needed(target, write.commit, action_label, change_count).await?;
    print_commit_outcome(&outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_size() {
        assert_eq!(parse_batch_size("25"), Ok(25));
        assert!(parse_batch_size("0").unwrap_err().contains("at least 1"));
        assert!(parse_batch_size("-3").is_err());
        assert!(parse_batch_size("lots").is_err());
    }

    #[test]
    fn test_report_migrations_returns_replay_error() {
        let stats = MigrationStats {
            total: 3,
            applied: 1,
            failed: 1,
            ..Default::default()
        };
        let failed = MigrationError::Replay {
            error: anyhow::anyhow!("Migration 2 (init quests) failed: bad schema"),
            stats,
        };
        let err = report_migrations(Err(failed), false).unwrap_err();
        assert_eq!(err.to_string(), "Migration 2 (init quests) failed: bad schema");

        assert_eq!(report_migrations(Ok(stats), false).unwrap().applied, 1);
    }
}
