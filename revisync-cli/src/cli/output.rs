//! Terminal summaries and progress output

use colored::*;
use std::io::Write;

use crate::sync::{
    CommitOutcome, ExportStats, MigrationStats, RowSyncError, RunStats, SyncProgress, UploadStats,
};

const TABLE_COLUMN: usize = 24;

/// Write one progress line to stderr, ending the line when a phase completes
pub fn print_progress(progress: &SyncProgress<'_>) {
    let line = format!(
        "  {} {} {}/{}",
        progress.table_id,
        progress.phase.label(),
        progress.current,
        progress.total
    );
    let mut stderr = std::io::stderr().lock();
    if progress.current >= progress.total {
        let _ = writeln!(stderr, "\r{}", line);
    } else {
        let _ = write!(stderr, "\r{}", line);
        let _ = stderr.flush();
    }
}

fn stats_row(name: &str, stats: &UploadStats) -> String {
    format!(
        "{:<width$} {:>8} {:>8} {:>8} {:>8} {:>8}",
        name,
        stats.created,
        stats.updated,
        stats.skipped,
        stats.invalid_schema,
        stats.create_errors + stats.update_errors + stats.other_errors,
        width = TABLE_COLUMN
    )
}

/// Per-table counters followed by the run totals
pub fn format_run_table(run: &RunStats) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<width$} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Table",
        "Created",
        "Updated",
        "Skipped",
        "Invalid",
        "Errors",
        width = TABLE_COLUMN
    )];
    lines.extend(run.tables.iter().map(|t| stats_row(&t.table_id, &t.stats)));
    lines.push(stats_row("Total", &run.totals));
    lines
}

pub fn print_run_summary(title: &str, run: &RunStats, dry_run: bool) {
    println!();
    if dry_run {
        println!("{} {}", title.bold(), "(dry run, nothing written)".yellow());
    } else {
        println!("{}", title.bold());
    }

    let lines = format_run_table(run);
    let last = lines.len() - 1;
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("{}", line.dimmed());
        } else if i == last {
            println!("{}", line.bold());
        } else {
            println!("{}", line);
        }
    }

    for warning in &run.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
}

pub fn print_migration_summary(stats: &MigrationStats, dry_run: bool) {
    println!();
    if dry_run {
        println!(
            "{} {} of {} migration(s) would be applied, {} already present",
            "Dry run:".yellow().bold(),
            stats.pending.to_string().bright_green(),
            stats.total,
            stats.skipped
        );
    } else {
        println!(
            "Applied {} of {} migration(s), {} already present",
            stats.applied.to_string().bright_green().bold(),
            stats.total,
            stats.skipped
        );
    }
    if stats.failed > 0 {
        println!(
            "{} {} migration(s) failed; the {} applied before the failure remain in the draft",
            "Error:".red().bold(),
            stats.failed,
            stats.applied
        );
    }
}

pub fn print_export_summary(stats: &ExportStats, folder: &std::path::Path) {
    println!();
    println!(
        "Saved {} row(s) from {} table(s) to {}",
        stats.rows.to_string().bright_green().bold(),
        stats.tables,
        folder.display().to_string().cyan()
    );
    if stats.skipped_rows > 0 {
        println!(
            "{} {} row(s) had ids that are not valid file names",
            "warning:".yellow().bold(),
            stats.skipped_rows
        );
    }
    for table in &stats.failed_tables {
        println!("{} table '{}' could not be saved", "warning:".yellow().bold(), table);
    }
}

pub fn print_commit_outcome(outcome: &CommitOutcome) {
    match outcome {
        CommitOutcome::NoChanges => println!("{}", "No changes, nothing to commit".dimmed()),
        CommitOutcome::LeftInDraft { changes } => println!(
            "{} {} change(s) left in the draft; use --commit to create a revision",
            "note:".yellow().bold(),
            changes
        ),
        CommitOutcome::Committed(record) => println!(
            "Committed revision {}",
            record.revision_id.bright_green().bold()
        ),
    }
}

pub fn print_sync_failure(error: &RowSyncError) {
    eprintln!();
    eprintln!(
        "{} table '{}' stopped after {} created, {} updated",
        "Sync failed:".red().bold(),
        error.table_id,
        error.partial.created,
        error.partial.updated
    );
    if let Some(guidance) = error.guidance() {
        eprintln!("{} {}", "hint:".cyan().bold(), guidance);
    }
}
