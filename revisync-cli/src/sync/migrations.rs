//! Migration replay: schema sync and the single-project apply flow

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::api::{Connection, Migration, MigrationStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    /// Migrations offered for replay
    pub total: usize,
    pub applied: usize,
    /// Already present on the target (locally detected or reported by the backend)
    pub skipped: usize,
    pub failed: usize,
    /// Would be applied; only set by dry runs
    pub pending: usize,
}

/// A failed replay together with what was counted before the failure
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Migrations applied before `error` stay in the target draft
    #[error("{error:#}")]
    Replay {
        error: anyhow::Error,
        stats: MigrationStats,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Source migrations not yet present on the target, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan<'a> {
    pub pending: Vec<&'a Migration>,
    pub already_applied: usize,
}

/// Compare a migration history against what the target already has
///
/// A migration counts as present when its id, or its hash if it has one,
/// matches a target migration.
pub fn plan_migrations<'a>(source: &'a [Migration], existing: &[Migration]) -> MigrationPlan<'a> {
    let ids: HashSet<&str> = existing.iter().map(|m| m.id.as_str()).collect();
    let hashes: HashSet<&str> = existing.iter().filter_map(|m| m.hash.as_deref()).collect();

    let (present, pending): (Vec<&Migration>, Vec<&Migration>) = source.iter().partition(|m| {
        ids.contains(m.id.as_str()) || m.hash.as_deref().is_some_and(|h| hashes.contains(h))
    });

    MigrationPlan {
        pending,
        already_applied: present.len(),
    }
}

/// Replay `migrations` against the target draft
///
/// Dry runs only read the target's history and report what would be applied.
/// A migration that cannot be sent, or that the backend reports as failed,
/// aborts the replay.
pub async fn apply_migrations(
    target: &Connection,
    migrations: &[Migration],
    dry_run: bool,
) -> Result<MigrationStats, MigrationError> {
    let existing = target
        .client()
        .get_migrations(target.draft_revision_id())
        .await
        .context("Failed to read target migrations")?;

    let plan = plan_migrations(migrations, &existing);
    let mut stats = MigrationStats {
        total: migrations.len(),
        skipped: plan.already_applied,
        ..Default::default()
    };

    info!(
        "{} migration(s): {} already on target, {} to apply",
        migrations.len(),
        plan.already_applied,
        plan.pending.len()
    );

    if dry_run {
        stats.pending = plan.pending.len();
        return Ok(stats);
    }

    for migration in plan.pending {
        let label = format!(
            "{} ({} {})",
            migration.id,
            migration.change_type.label(),
            migration.table_id
        );
        let error = match target
            .client()
            .apply_migration(target.draft_revision_id(), migration)
            .await
        {
            Ok(result) => match result.status {
                MigrationStatus::Applied => {
                    debug!("Applied migration {} on '{}'", migration.id, migration.table_id);
                    stats.applied += 1;
                    continue;
                }
                MigrationStatus::Skipped => {
                    stats.skipped += 1;
                    continue;
                }
                MigrationStatus::Failed => anyhow!(
                    "Migration {} failed: {}",
                    label,
                    result.error.as_deref().unwrap_or("no reason given")
                ),
            },
            Err(err) => anyhow::Error::new(err).context(format!("Failed to apply migration {}", label)),
        };

        stats.failed += 1;
        return Err(MigrationError::Replay { error, stats });
    }

    Ok(stats)
}

/// Replay the source's migration history onto the target
pub async fn sync_schema(
    source: &Connection,
    target: &Connection,
    dry_run: bool,
) -> Result<MigrationStats, MigrationError> {
    let migrations = source
        .client()
        .get_migrations(source.read_revision_id())
        .await
        .context("Failed to read source migrations")?;

    apply_migrations(target, &migrations, dry_run).await
}

pub fn load_migrations_file(path: &Path) -> Result<Vec<Migration>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read migrations file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid migrations file: {}", path.display()))
}

pub fn save_migrations_file(path: &Path, migrations: &[Migration]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(migrations)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write migrations file: {}", path.display()))
}
