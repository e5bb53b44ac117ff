//! Migration command handlers

use anyhow::Result;
use colored::*;

use super::{ApplyArgs, MigrateCommands, SaveArgs};
use crate::cli::Context;
use crate::cli::commands::{connect, finish, report_migrations};
use crate::config::ConnectionRole;
use crate::sync::{apply_migrations, export_migrations, load_migrations_file};

pub async fn handle_migrate_command(args: MigrateCommands, ctx: &Context) -> Result<()> {
    match args {
        MigrateCommands::Apply(args) => apply(args, ctx).await,
        MigrateCommands::Save(args) => save(args, ctx).await,
    }
}

async fn apply(args: ApplyArgs, ctx: &Context) -> Result<()> {
    let migrations = load_migrations_file(&args.file)?;
    if migrations.is_empty() {
        anyhow::bail!("Migrations file is empty: {}", args.file.display());
    }

    let target = connect(&args.target, ctx, ConnectionRole::Target).await?;
    println!(
        "Applying {} migration(s) from {} to {}",
        migrations.len(),
        args.file.display().to_string().cyan(),
        target.project().to_string().bright_green().bold()
    );

    let stats = report_migrations(
        apply_migrations(&target, &migrations, args.write.dry_run).await,
        args.write.dry_run,
    )?;

    finish(&target, &args.write, "Applied", stats.applied).await
}

async fn save(args: SaveArgs, ctx: &Context) -> Result<()> {
    let source = connect(&args.source, ctx, ConnectionRole::Source).await?;
    let count = export_migrations(&source, &args.file).await?;
    println!(
        "Saved {} migration(s) of {} to {}",
        count.to_string().bright_green().bold(),
        source.project(),
        args.file.display().to_string().cyan()
    );
    Ok(())
}
