//! The narrow client contract the sync engine relies on

use async_trait::async_trait;
use serde_json::Value;

use super::error::ApiResult;
use super::models::{
    BranchRevisions, Migration, MigrationResult, ProjectRef, RevisionInfo, RowRecord, TableInfo,
};
use super::pagination::{Page, PageRequest};

/// Operations a revisioned project exposes
///
/// Implemented by the GraphQL client for real projects and by an in-memory
/// project in tests. Listing calls are paginated; callers loop with
/// [`super::pagination::fetch_all`].
#[async_trait]
pub trait ProjectClient: Send + Sync {
    /// Resolve head and draft revision ids of a branch
    async fn get_branch(&self, project: &ProjectRef) -> ApiResult<BranchRevisions>;

    async fn list_tables(&self, revision_id: &str, page: PageRequest) -> ApiResult<Page<TableInfo>>;

    /// Raw JSON schema of a table
    async fn get_table_schema(&self, revision_id: &str, table_id: &str) -> ApiResult<Value>;

    async fn list_rows(
        &self,
        revision_id: &str,
        table_id: &str,
        page: PageRequest,
    ) -> ApiResult<Page<RowRecord>>;

    async fn create_rows(
        &self,
        revision_id: &str,
        table_id: &str,
        rows: &[RowRecord],
    ) -> ApiResult<()>;

    async fn update_rows(
        &self,
        revision_id: &str,
        table_id: &str,
        rows: &[RowRecord],
    ) -> ApiResult<()>;

    /// Commit the draft of a branch into a new head revision
    async fn create_revision(&self, project: &ProjectRef, comment: &str) -> ApiResult<RevisionInfo>;

    /// Migration history of a revision, oldest first
    async fn get_migrations(&self, revision_id: &str) -> ApiResult<Vec<Migration>>;

    async fn apply_migration(
        &self,
        revision_id: &str,
        migration: &Migration,
    ) -> ApiResult<MigrationResult>;
}
