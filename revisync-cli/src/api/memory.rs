//! In-memory project used by the test suites
//!
//! Behaves like a single branch with one draft: every revision id reads the
//! draft state. Every call is recorded so tests can assert on the exact
//! sequence of requests, and failures can be injected per table.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::client::ProjectClient;
use super::error::{ApiError, ApiResult};
use super::models::{
    BranchRevisions, ChangeType, Migration, MigrationResult, MigrationStatus, ProjectRef,
    RevisionInfo, RowRecord, TableInfo,
};
use super::pagination::{Edge, Page, PageInfo, PageRequest};

/// One recorded client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: &'static str,
    pub table: Option<String>,
    pub rows: usize,
}

#[derive(Debug, Default)]
struct MemoryTable {
    id: String,
    schema: Value,
    rows: Vec<RowRecord>,
}

#[derive(Debug, Default)]
struct State {
    tables: Vec<MemoryTable>,
    migrations: Vec<Migration>,
    calls: Vec<Call>,
    commits: Vec<String>,
    head: usize,
    create_failures: HashMap<String, ApiError>,
    update_failures: HashMap<String, ApiError>,
    schema_failures: HashSet<String>,
    migration_failures: HashSet<String>,
    commit_failure: Option<ApiError>,
}

#[derive(Debug, Default)]
pub struct MemoryProject {
    state: Mutex<State>,
}

impl MemoryProject {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn project_ref() -> ProjectRef {
        ProjectRef {
            organization: "org".to_string(),
            project: "game".to_string(),
            branch: "master".to_string(),
        }
    }

    pub fn add_table(&self, table_id: &str, schema: Value) {
        self.state.lock().unwrap().tables.push(MemoryTable {
            id: table_id.to_string(),
            schema,
            rows: Vec::new(),
        });
    }

    pub fn insert_row(&self, table_id: &str, row_id: &str, data: Value) {
        let mut state = self.state.lock().unwrap();
        let table = state
            .tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .expect("table must exist");
        table.rows.push(RowRecord::new(row_id, data));
    }

    pub fn rows(&self, table_id: &str) -> Vec<RowRecord> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn table_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.tables.iter().map(|t| t.id.clone()).collect()
    }

    pub fn add_migration(&self, migration: Migration) {
        self.state.lock().unwrap().migrations.push(migration);
    }

    pub fn migration_ids(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.migrations.iter().map(|m| m.id.clone()).collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_named(&self, name: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.iter().filter(|c| c.name == name).count()
    }

    /// Mutating calls (creates, updates, commits, migrations) recorded so far
    pub fn mutating_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c.name,
                    "create_rows" | "update_rows" | "create_revision" | "apply_migration"
                )
            })
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn commits(&self) -> Vec<String> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn fail_creates(&self, table_id: &str, error: ApiError) {
        let mut state = self.state.lock().unwrap();
        state.create_failures.insert(table_id.to_string(), error);
    }

    pub fn fail_updates(&self, table_id: &str, error: ApiError) {
        let mut state = self.state.lock().unwrap();
        state.update_failures.insert(table_id.to_string(), error);
    }

    pub fn fail_schema(&self, table_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.schema_failures.insert(table_id.to_string());
    }

    pub fn fail_migration(&self, migration_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.migration_failures.insert(migration_id.to_string());
    }

    pub fn fail_commit(&self, error: ApiError) {
        self.state.lock().unwrap().commit_failure = Some(error);
    }

    fn record(state: &mut State, name: &'static str, table: Option<&str>, rows: usize) {
        state.calls.push(Call {
            name,
            table: table.map(String::from),
            rows,
        });
    }
}

fn paginate<T: Clone>(items: &[T], page: &PageRequest) -> ApiResult<Page<T>> {
    let start = match &page.after {
        Some(cursor) => cursor
            .parse::<usize>()
            .map_err(|_| ApiError::Protocol(format!("bad cursor {}", cursor)))?,
        None => 0,
    };
    let end = (start + page.first).min(items.len());
    let edges = items[start.min(end)..end]
        .iter()
        .cloned()
        .map(|node| Edge { node })
        .collect();

    Ok(Page {
        edges,
        page_info: PageInfo {
            has_next_page: end < items.len(),
            end_cursor: Some(end.to_string()),
        },
        total_count: items.len(),
    })
}

fn not_found(table_id: &str) -> ApiError {
    ApiError::NotFound(format!("table {}", table_id))
}

#[async_trait]
impl ProjectClient for MemoryProject {
    async fn get_branch(&self, _project: &ProjectRef) -> ApiResult<BranchRevisions> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "get_branch", None, 0);
        Ok(BranchRevisions {
            head_revision_id: format!("head-{}", state.head),
            draft_revision_id: "draft".to_string(),
        })
    }

    async fn list_tables(&self, _revision_id: &str, page: PageRequest) -> ApiResult<Page<TableInfo>> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "list_tables", None, 0);
        let tables: Vec<TableInfo> = state
            .tables
            .iter()
            .map(|t| TableInfo { id: t.id.clone() })
            .collect();
        paginate(&tables, &page)
    }

    async fn get_table_schema(&self, _revision_id: &str, table_id: &str) -> ApiResult<Value> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "get_table_schema", Some(table_id), 0);
        if state.schema_failures.contains(table_id) {
            return Err(ApiError::Http {
                status: 500,
                message: "schema unavailable".to_string(),
            });
        }
        state
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .map(|t| t.schema.clone())
            .ok_or_else(|| not_found(table_id))
    }

    async fn list_rows(
        &self,
        _revision_id: &str,
        table_id: &str,
        page: PageRequest,
    ) -> ApiResult<Page<RowRecord>> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "list_rows", Some(table_id), 0);
        let table = state
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .ok_or_else(|| not_found(table_id))?;
        paginate(&table.rows, &page)
    }

    async fn create_rows(
        &self,
        _revision_id: &str,
        table_id: &str,
        rows: &[RowRecord],
    ) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "create_rows", Some(table_id), rows.len());
        if let Some(err) = state.create_failures.get(table_id) {
            return Err(err.clone());
        }
        let table = state
            .tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| not_found(table_id))?;
        if let Some(dup) = rows.iter().find(|r| table.rows.iter().any(|e| e.id == r.id)) {
            return Err(ApiError::Http {
                status: 400,
                message: format!("row {} already exists", dup.id),
            });
        }
        table.rows.extend(rows.iter().cloned());
        Ok(())
    }

    async fn update_rows(
        &self,
        _revision_id: &str,
        table_id: &str,
        rows: &[RowRecord],
    ) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "update_rows", Some(table_id), rows.len());
        if let Some(err) = state.update_failures.get(table_id) {
            return Err(err.clone());
        }
        let table = state
            .tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| not_found(table_id))?;
        for row in rows {
            let existing = table
                .rows
                .iter_mut()
                .find(|e| e.id == row.id)
                .ok_or_else(|| ApiError::NotFound(format!("row {}", row.id)))?;
            existing.data = row.data.clone();
        }
        Ok(())
    }

    async fn create_revision(&self, _project: &ProjectRef, comment: &str) -> ApiResult<RevisionInfo> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "create_revision", None, 0);
        if let Some(err) = state.commit_failure.clone() {
            return Err(err);
        }
        state.head += 1;
        state.commits.push(comment.to_string());
        Ok(RevisionInfo {
            id: format!("head-{}", state.head),
        })
    }

    async fn get_migrations(&self, _revision_id: &str) -> ApiResult<Vec<Migration>> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "get_migrations", None, 0);
        Ok(state.migrations.clone())
    }

    async fn apply_migration(
        &self,
        _revision_id: &str,
        migration: &Migration,
    ) -> ApiResult<MigrationResult> {
        let mut state = self.state.lock().unwrap();
        Self::record(&mut state, "apply_migration", Some(&migration.table_id), 0);

        if state.migration_failures.contains(&migration.id) {
            return Ok(MigrationResult {
                id: migration.id.clone(),
                status: MigrationStatus::Failed,
                error: Some("schema conflict".to_string()),
            });
        }
        if state.migrations.iter().any(|m| m.id == migration.id) {
            return Ok(MigrationResult {
                id: migration.id.clone(),
                status: MigrationStatus::Skipped,
                error: None,
            });
        }

        if migration.change_type == ChangeType::Init {
            state.tables.push(MemoryTable {
                id: migration.table_id.clone(),
                schema: migration.payload.get("schema").cloned().unwrap_or(Value::Null),
                rows: Vec::new(),
            });
        }
        state.migrations.push(migration.clone());

        Ok(MigrationResult {
            id: migration.id.clone(),
            status: MigrationStatus::Applied,
            error: None,
        })
    }
}
