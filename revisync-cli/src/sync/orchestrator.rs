//! Data sync: resolve table order, then run the engine table by table

use anyhow::Context;
use log::{info, warn};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use super::dependency_graph::resolve;
use super::engine::{ProgressFn, SyncOptions, sync_table};
use super::error::RowSyncError;
use super::schema::{SchemaNode, TableSchema};
use super::source::{RowSource, RowValidator};
use super::stats::{RunStats, UploadStats};
use crate::api::Connection;

#[derive(Debug, Clone, Default)]
pub struct DataSyncOptions {
    /// Restrict the run to these tables
    pub tables: Option<Vec<String>>,
    pub sync: SyncOptions,
    /// Check rows against the target's table schemas before diffing
    pub validate: bool,
}

/// A failed data sync together with everything counted before the failure
#[derive(Debug, Error)]
pub enum DataSyncError {
    #[error("{error}")]
    Table {
        error: RowSyncError,
        stats: RunStats,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fetch the schema of every listed table; unavailable schemas become `None`
pub async fn fetch_schemas(
    target: &Connection,
    tables: &[String],
    wanted: &HashSet<String>,
) -> Vec<(String, Option<TableSchema>)> {
    let mut schemas = Vec::with_capacity(tables.len());
    for table_id in tables {
        if !wanted.contains(table_id) {
            schemas.push((table_id.clone(), None));
            continue;
        }
        let schema = match target
            .client()
            .get_table_schema(target.draft_revision_id(), table_id)
            .await
        {
            Ok(value) => Some(TableSchema::new(table_id, &value)),
            Err(err) => {
                warn!(
                    "Could not fetch schema of '{}' ({}); treating it as having no references",
                    table_id, err
                );
                None
            }
        };
        schemas.push((table_id.clone(), schema));
    }
    schemas
}

/// Validator checking rows against the schema of their table
///
/// Tables without a schema accept every row.
pub fn schema_validator(schemas: &[(String, Option<TableSchema>)]) -> RowValidator {
    let by_table: HashMap<String, SchemaNode> = schemas
        .iter()
        .filter_map(|(id, schema)| schema.as_ref().map(|s| (id.clone(), s.schema.clone())))
        .collect();
    Arc::new(move |table_id: &str, data: &Value| {
        by_table
            .get(table_id)
            .is_none_or(|schema| schema.accepts(data))
    })
}

/// Upload the rows of `source` into the target's draft, parents first
///
/// Fails fast: the first table that cannot be written ends the run and the
/// counters gathered so far travel with the error.
pub async fn sync_data(
    source: &dyn RowSource,
    target: &Connection,
    options: &DataSyncOptions,
    on_progress: Option<&ProgressFn>,
) -> Result<RunStats, DataSyncError> {
    let mut run = RunStats::default();

    let target_tables = target
        .list_table_ids(target.draft_revision_id())
        .await
        .context("Failed to list target tables")?;
    let source_tables = source.list_tables(options.tables.as_deref()).await?;

    let on_target: HashSet<&String> = target_tables.iter().collect();
    let mut scope = HashSet::new();
    for table_id in source_tables {
        if on_target.contains(&table_id) {
            scope.insert(table_id);
        } else {
            warn!("Table '{}' does not exist in the target, skipping", table_id);
            run.warn(format!("Table '{}' does not exist in the target", table_id));
        }
    }

    let schemas = fetch_schemas(target, &target_tables, &scope).await;
    let resolved = resolve(&schemas, &scope);
    for warning in resolved.warnings {
        run.warn(warning);
    }

    let validator = options.validate.then(|| schema_validator(&schemas));
    let with_schema: HashSet<&str> = schemas
        .iter()
        .filter(|(_, schema)| schema.is_some())
        .map(|(id, _)| id.as_str())
        .collect();

    info!(
        "Syncing {} table(s) from {} into {}: {}",
        resolved.order.len(),
        source.describe(),
        target.project(),
        resolved.order.join(", ")
    );

    for table_id in &resolved.order {
        if validator.is_some() && !with_schema.contains(table_id.as_str()) {
            warn!("No schema for '{}', rows not validated", table_id);
        }
        let loaded = source.load_rows(table_id, validator.as_ref()).await?;

        let loader_counts = UploadStats {
            total_rows: loaded.total_files,
            invalid_schema: loaded.invalid_count,
            other_errors: loaded.parse_errors,
            ..Default::default()
        };

        match sync_table(target, table_id, &loaded.rows, &options.sync, on_progress).await {
            Ok(stats) => run.record(table_id, merge_loader_counts(stats, loader_counts)),
            Err(mut error) => {
                error.partial = merge_loader_counts(error.partial, loader_counts);
                run.record(table_id, error.partial);
                return Err(DataSyncError::Table { error, stats: run });
            }
        }
    }

    Ok(run)
}

/// Engine counters only see accepted rows; the loader saw every unit
fn merge_loader_counts(mut stats: UploadStats, loader: UploadStats) -> UploadStats {
    stats.total_rows = loader.total_rows.max(stats.total_rows);
    stats.invalid_schema += loader.invalid_schema;
    stats.other_errors += loader.other_errors;
    stats
}
