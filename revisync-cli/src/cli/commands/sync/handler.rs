//! Project to project sync handlers

use anyhow::Result;
use colored::*;

use super::{DataArgs, SchemaArgs, SyncCommands};
use crate::api::Connection;
use crate::cli::Context;
use crate::cli::commands::{connect, finish, report_migrations, run_data_sync};
use crate::config::ConnectionRole;
use crate::sync::{ApiRowSource, DataSyncOptions, SyncOptions, sync_schema};

pub async fn handle_sync_command(args: SyncCommands, ctx: &Context) -> Result<()> {
    match args {
        SyncCommands::Schema(args) => schema(args, ctx).await,
        SyncCommands::Data(args) => data(args, ctx).await,
    }
}

async fn connect_pair(source: &str, target: &str, ctx: &Context) -> Result<(Connection, Connection)> {
    let source = connect(source, ctx, ConnectionRole::Source).await?;
    let target = connect(target, ctx, ConnectionRole::Target).await?;
    println!(
        "Syncing {} ({}) into {}",
        source.project().to_string().cyan(),
        source.read_revision_id().dimmed(),
        target.project().to_string().bright_green().bold()
    );
    Ok((source, target))
}

async fn schema(args: SchemaArgs, ctx: &Context) -> Result<()> {
    let (source, target) = connect_pair(&args.source, &args.target, ctx).await?;

    let stats = report_migrations(
        sync_schema(&source, &target, args.write.dry_run).await,
        args.write.dry_run,
    )?;

    finish(&target, &args.write, "Synced", stats.applied).await
}

async fn data(args: DataArgs, ctx: &Context) -> Result<()> {
    let (source, target) = connect_pair(&args.source, &args.target, ctx).await?;

    let options = DataSyncOptions {
        tables: args.tables.clone(),
        sync: SyncOptions {
            batch_size: args.batch.resolve(ctx),
            dry_run: args.write.dry_run,
        },
        validate: false,
    };
    let run = run_data_sync(&ApiRowSource::new(&source), &target, &options, ctx, "Sync summary").await?;

    finish(&target, &args.write, "Synced", run.changes()).await
}
