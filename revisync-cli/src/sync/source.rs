//! Row sources: where the rows of a sync come from
//!
//! A [`RowSource`] lists tables and loads the rows of one table at a time.
//! [`FileRowSource`] reads the on-disk layout (one directory per table, one
//! JSON file per row); [`ApiRowSource`] reads a revision of a remote project.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{Connection, RowRecord};

/// Row validation hook; `false` rejects the row
pub type RowValidator = Arc<dyn Fn(&str, &Value) -> bool + Send + Sync>;

/// Rows of one table plus loader counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRows {
    /// Accepted rows in stable order
    pub rows: Vec<RowRecord>,
    /// Row units seen (files on disk, rows fetched remotely)
    pub total_files: usize,
    /// Units rejected by the validator
    pub invalid_count: usize,
    /// Units that could not be parsed (or repeated an id)
    pub parse_errors: usize,
}

impl LoadedRows {
    /// Apply the validator and duplicate-id check to one parsed unit
    fn accept(
        &mut self,
        row: RowRecord,
        seen: &mut HashSet<String>,
        table_id: &str,
        validator: Option<&RowValidator>,
    ) {
        if !seen.insert(row.id.clone()) {
            warn!("Duplicate row id '{}' in table '{}', keeping the first", row.id, table_id);
            self.parse_errors += 1;
            return;
        }
        if let Some(validate) = validator {
            if !validate(table_id, &row.data) {
                debug!("Row '{}' in table '{}' failed validation", row.id, table_id);
                self.invalid_count += 1;
                return;
            }
        }
        self.rows.push(row);
    }
}

#[async_trait]
pub trait RowSource: Send + Sync {
    /// Human readable description for logs
    fn describe(&self) -> String;

    /// Tables this source can supply; `scope` restricts the result
    async fn list_tables(&self, scope: Option<&[String]>) -> Result<Vec<String>>;

    /// Load one table; rows `validator` rejects are counted, not returned
    async fn load_rows(
        &self,
        table_id: &str,
        validator: Option<&RowValidator>,
    ) -> Result<LoadedRows>;
}

fn filter_scope(tables: Vec<String>, scope: Option<&[String]>) -> Vec<String> {
    match scope {
        Some(wanted) => {
            let available: HashSet<&String> = tables.iter().collect();
            for missing in wanted.iter().filter(|t| !available.contains(t)) {
                warn!("Table '{}' not found in source, skipping", missing);
            }
            let wanted: HashSet<&String> = wanted.iter().collect();
            tables.into_iter().filter(|t| wanted.contains(t)).collect()
        }
        None => tables,
    }
}

#[derive(Debug, Deserialize)]
struct RowFile {
    id: String,
    data: Value,
}

/// Rows stored as `<root>/<table>/<row>.json`
pub struct FileRowSource {
    root: PathBuf,
}

impl FileRowSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_dir(&self, table_id: &str) -> PathBuf {
        self.root.join(table_id)
    }

    fn row_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read table directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl RowSource for FileRowSource {
    fn describe(&self) -> String {
        format!("folder {}", self.root.display())
    }

    async fn list_tables(&self, scope: Option<&[String]>) -> Result<Vec<String>> {
        if let Some(wanted) = scope {
            // Explicit tables are taken as given; missing folders load as empty
            return Ok(wanted.to_vec());
        }

        let mut tables: Vec<String> = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read folder: {}", self.root.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .filter(|name| !name.starts_with('.'))
            .collect();
        tables.sort();
        Ok(tables)
    }

    async fn load_rows(
        &self,
        table_id: &str,
        validator: Option<&RowValidator>,
    ) -> Result<LoadedRows> {
        let dir = self.table_dir(table_id);
        let mut loaded = LoadedRows::default();

        if !dir.is_dir() {
            warn!("No folder for table '{}' at {}", table_id, dir.display());
            return Ok(loaded);
        }

        let files = Self::row_files(&dir)?;
        loaded.total_files = files.len();
        let mut seen = HashSet::new();

        for path in files {
            let parsed = fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| {
                    serde_json::from_str::<RowFile>(&content).map_err(anyhow::Error::from)
                });

            match parsed {
                Ok(file) => loaded.accept(
                    RowRecord::new(file.id, file.data),
                    &mut seen,
                    table_id,
                    validator,
                ),
                Err(err) => {
                    warn!("Skipping malformed row file {}: {}", path.display(), err);
                    loaded.parse_errors += 1;
                }
            }
        }

        debug!(
            "Loaded {} of {} row files from table '{}'",
            loaded.rows.len(),
            loaded.total_files,
            table_id
        );
        Ok(loaded)
    }
}

/// Rows read from a revision of a remote project
pub struct ApiRowSource<'a> {
    connection: &'a Connection,
}

impl<'a> ApiRowSource<'a> {
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RowSource for ApiRowSource<'_> {
    fn describe(&self) -> String {
        format!(
            "{} @ {}",
            self.connection.project(),
            self.connection.read_revision_id()
        )
    }

    async fn list_tables(&self, scope: Option<&[String]>) -> Result<Vec<String>> {
        let tables = self
            .connection
            .list_table_ids(self.connection.read_revision_id())
            .await
            .context("Failed to list source tables")?;
        Ok(filter_scope(tables, scope))
    }

    async fn load_rows(
        &self,
        table_id: &str,
        validator: Option<&RowValidator>,
    ) -> Result<LoadedRows> {
        let rows = self
            .connection
            .list_all_rows(self.connection.read_revision_id(), table_id, |_, _| {})
            .await
            .with_context(|| format!("Failed to load rows of source table '{}'", table_id))?;

        let mut loaded = LoadedRows {
            total_files: rows.len(),
            ..Default::default()
        };
        let mut seen = HashSet::new();
        for row in rows {
            loaded.accept(row, &mut seen, table_id, validator);
        }
        Ok(loaded)
    }
}
