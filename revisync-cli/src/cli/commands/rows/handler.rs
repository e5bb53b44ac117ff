//! Row upload and save handlers

use anyhow::Result;
use colored::*;

use super::{RowsCommands, SaveArgs, UploadArgs};
use crate::cli::Context;
use crate::cli::commands::{connect, finish, run_data_sync};
use crate::cli::output::print_export_summary;
use crate::config::ConnectionRole;
use crate::sync::{ApiRowSource, DataSyncOptions, FileRowSource, SyncOptions, export_rows};

pub async fn handle_rows_command(args: RowsCommands, ctx: &Context) -> Result<()> {
    match args {
        RowsCommands::Upload(args) => upload(args, ctx).await,
        RowsCommands::Save(args) => save(args, ctx).await,
    }
}

async fn upload(args: UploadArgs, ctx: &Context) -> Result<()> {
    if !args.folder.is_dir() {
        anyhow::bail!("Folder does not exist: {}", args.folder.display());
    }

    let target = connect(&args.target, ctx, ConnectionRole::Target).await?;
    println!(
        "Uploading rows from {} to {}",
        args.folder.display().to_string().cyan(),
        target.project().to_string().bright_green().bold()
    );

    let options = DataSyncOptions {
        tables: args.tables.clone(),
        sync: SyncOptions {
            batch_size: args.batch.resolve(ctx),
            dry_run: args.write.dry_run,
        },
        validate: args.validate,
    };
    let source = FileRowSource::new(&args.folder);
    let run = run_data_sync(&source, &target, &options, ctx, "Upload summary").await?;

    finish(&target, &args.write, "Uploaded", run.changes()).await
}

async fn save(args: SaveArgs, ctx: &Context) -> Result<()> {
    let source = connect(&args.source, ctx, ConnectionRole::Source).await?;
    println!(
        "Saving rows of {} to {}",
        source.project().to_string().bright_green().bold(),
        args.folder.display().to_string().cyan()
    );

    let stats = export_rows(&ApiRowSource::new(&source), &args.folder, args.tables.as_deref()).await?;
    print_export_summary(&stats, &args.folder);
    Ok(())
}
