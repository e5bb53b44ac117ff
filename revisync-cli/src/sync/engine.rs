//! Row sync engine: diff one table against the target and write the changes
//!
//! A table pass fetches the target's current rows, classifies every input
//! row, then issues create batches followed by update batches, one call at a
//! time. The first failing call ends the pass with a [`RowSyncError`]; nothing
//! is retried and nothing already written is rolled back.

use log::{debug, info};

use super::diff::{SyncPlan, batch_count, build_index, chunk_rows};
use super::error::{BatchOperation, RowSyncError};
use super::stats::UploadStats;
use crate::api::{Connection, RowRecord};

/// Default number of rows per create/update call
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub batch_size: usize,
    /// Diff only; no mutating calls
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Fetch,
    Create,
    Update,
}

impl SyncPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch => "fetching",
            Self::Create => "creating",
            Self::Update => "updating",
        }
    }
}

/// Progress of one phase of a table pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress<'a> {
    pub table_id: &'a str,
    pub phase: SyncPhase,
    pub current: usize,
    pub total: usize,
}

/// Progress callback; purely observational
pub type ProgressFn = dyn Fn(&SyncProgress<'_>) + Send + Sync;

/// Sync `rows` into `table_id` of the target's draft revision
///
/// An empty `rows` slice returns zeroed stats without contacting the target.
pub async fn sync_table(
    target: &Connection,
    table_id: &str,
    rows: &[RowRecord],
    options: &SyncOptions,
    on_progress: Option<&ProgressFn>,
) -> Result<UploadStats, RowSyncError> {
    let mut stats = UploadStats {
        total_rows: rows.len(),
        ..Default::default()
    };

    if rows.is_empty() {
        debug!("Table '{}': no rows to sync", table_id);
        return Ok(stats);
    }

    let batch_size = options.batch_size.max(1);
    let report = |phase: SyncPhase, current: usize, total: usize| {
        if let Some(callback) = on_progress {
            callback(&SyncProgress {
                table_id,
                phase,
                current,
                total,
            });
        }
    };

    let existing = target
        .list_all_rows(target.draft_revision_id(), table_id, |done, total| {
            report(SyncPhase::Fetch, done, total)
        })
        .await
        .map_err(|err| {
            RowSyncError::from_api(table_id, BatchOperation::Fetch, batch_size, &err, stats)
        })?;

    let index = build_index(existing);
    let plan = SyncPlan::build(rows, &index);
    stats.skipped = plan.to_skip.len();
    stats.other_errors = plan.duplicates;

    info!(
        "Table '{}': {} to create ({} batches), {} to update ({} batches), {} unchanged",
        table_id,
        plan.to_create.len(),
        batch_count(plan.to_create.len(), batch_size),
        plan.to_update.len(),
        batch_count(plan.to_update.len(), batch_size),
        plan.to_skip.len()
    );

    if options.dry_run {
        stats.created = plan.to_create.len();
        stats.updated = plan.to_update.len();
        return Ok(stats);
    }

    let create_total = plan.to_create.len();
    for batch in chunk_rows(&plan.to_create, batch_size) {
        if let Err(err) = target
            .client()
            .create_rows(target.draft_revision_id(), table_id, &batch)
            .await
        {
            stats.create_errors += batch.len();
            return Err(RowSyncError::from_api(
                table_id,
                BatchOperation::Create,
                batch_size,
                &err,
                stats,
            ));
        }
        stats.created += batch.len();
        debug!("Table '{}': created {}/{}", table_id, stats.created, create_total);
        report(SyncPhase::Create, stats.created, create_total);
    }

    let update_total = plan.to_update.len();
    for batch in chunk_rows(&plan.to_update, batch_size) {
        if let Err(err) = target
            .client()
            .update_rows(target.draft_revision_id(), table_id, &batch)
            .await
        {
            stats.update_errors += batch.len();
            return Err(RowSyncError::from_api(
                table_id,
                BatchOperation::Update,
                batch_size,
                &err,
                stats,
            ));
        }
        stats.updated += batch.len();
        debug!("Table '{}': updated {}/{}", table_id, stats.updated, update_total);
        report(SyncPhase::Update, stats.updated, update_total);
    }

    Ok(stats)
}
