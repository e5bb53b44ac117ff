//! GraphQL implementation of [`ProjectClient`] using reqwest

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

use super::client::ProjectClient;
use super::error::{ApiError, ApiResult};
use super::models::{
    BranchRevisions, Migration, MigrationResult, ProjectRef, RevisionInfo, RowRecord, TableInfo,
};
use super::pagination::{Page, PageRequest};

const USER_AGENT: &str = concat!("revisync/", env!("CARGO_PKG_VERSION"));

/// Longest response body excerpt kept in error messages
const MAX_ERROR_BODY: usize = 512;

mod queries {
    pub const BRANCH: &str = r#"
        query Branch($data: GetBranchInput!) {
          branch(data: $data) { head { id } draft { id } }
        }"#;

    pub const TABLES: &str = r#"
        query Tables($data: GetTablesInput!) {
          tables(data: $data) {
            totalCount
            pageInfo { hasNextPage endCursor }
            edges { node { id } }
          }
        }"#;

    pub const TABLE_SCHEMA: &str = r#"
        query TableSchema($data: GetTableInput!) {
          table(data: $data) { id schema }
        }"#;

    pub const ROWS: &str = r#"
        query Rows($data: GetRowsInput!) {
          rows(data: $data) {
            totalCount
            pageInfo { hasNextPage endCursor }
            edges { node { id data } }
          }
        }"#;

    pub const CREATE_ROWS: &str = r#"
        mutation CreateRows($data: CreateRowsInput!) {
          createRows(data: $data) { table { id } }
        }"#;

    pub const UPDATE_ROWS: &str = r#"
        mutation UpdateRows($data: UpdateRowsInput!) {
          updateRows(data: $data) { table { id } }
        }"#;

    pub const CREATE_REVISION: &str = r#"
        mutation CreateRevision($data: CreateRevisionInput!) {
          createRevision(data: $data) { id }
        }"#;

    pub const MIGRATIONS: &str = r#"
        query Migrations($data: GetMigrationsInput!) {
          migrations(data: $data)
        }"#;

    pub const APPLY_MIGRATION: &str = r#"
        mutation ApplyMigration($data: ApplyMigrationInput!) {
          applyMigration(data: $data) { id status error }
        }"#;
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

impl GraphQlErrorEntry {
    /// Status code some servers attach under `extensions`
    fn status(&self) -> Option<u16> {
        let ext = self.extensions.as_ref()?;
        ["statusCode", "status"]
            .iter()
            .find_map(|key| ext.get(*key).and_then(Value::as_u64))
            .or_else(|| {
                ext.get("originalError")
                    .and_then(|e| e.get("statusCode"))
                    .and_then(Value::as_u64)
            })
            .and_then(|s| u16::try_from(s).ok())
    }
}

/// Client for a revisioned project GraphQL endpoint
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> ApiResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token,
        })
    }

    /// Execute a query and decode the field `field` of `data`
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        data: Value,
        field: &str,
    ) -> ApiResult<T> {
        debug!("GraphQL {} -> {}", operation, self.endpoint);

        let mut request = self.http.post(&self.endpoint).json(&json!({
            "operationName": operation,
            "query": query,
            "variables": { "data": data },
        }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!("GraphQL {} responded {}: {}", operation, status, body);

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: excerpt(&body, status.canonical_reason().unwrap_or("request failed")),
            });
        }

        let parsed: GraphQlResponse = serde_json::from_str(&body)?;
        if let Some(first) = parsed.errors.first() {
            let message = parsed
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::GraphQl {
                message,
                status: first.status(),
            });
        }

        let value = parsed
            .data
            .and_then(|mut d| d.get_mut(field).map(Value::take))
            .ok_or_else(|| ApiError::Decode(format!("response has no `{}` field", field)))?;

        if value.is_null() {
            return Err(ApiError::NotFound(format!("{} returned null", operation)));
        }

        Ok(serde_json::from_value(value)?)
    }
}

fn excerpt(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[derive(Deserialize)]
struct IdNode {
    id: String,
}

#[derive(Deserialize)]
struct BranchNode {
    head: IdNode,
    draft: IdNode,
}

#[derive(Deserialize)]
struct TableNode {
    schema: Value,
}

#[async_trait]
impl ProjectClient for GraphqlClient {
    async fn get_branch(&self, project: &ProjectRef) -> ApiResult<BranchRevisions> {
        let node: BranchNode = self
            .execute(
                "Branch",
                queries::BRANCH,
                json!({
                    "organizationId": project.organization,
                    "projectName": project.project,
                    "branchName": project.branch,
                }),
                "branch",
            )
            .await?;

        Ok(BranchRevisions {
            head_revision_id: node.head.id,
            draft_revision_id: node.draft.id,
        })
    }

    async fn list_tables(&self, revision_id: &str, page: PageRequest) -> ApiResult<Page<TableInfo>> {
        self.execute(
            "Tables",
            queries::TABLES,
            json!({ "revisionId": revision_id, "first": page.first, "after": page.after }),
            "tables",
        )
        .await
    }

    async fn get_table_schema(&self, revision_id: &str, table_id: &str) -> ApiResult<Value> {
        let node: TableNode = self
            .execute(
                "TableSchema",
                queries::TABLE_SCHEMA,
                json!({ "revisionId": revision_id, "tableId": table_id }),
                "table",
            )
            .await?;
        Ok(node.schema)
    }

    async fn list_rows(
        &self,
        revision_id: &str,
        table_id: &str,
        page: PageRequest,
    ) -> ApiResult<Page<RowRecord>> {
        self.execute(
            "Rows",
            queries::ROWS,
            json!({
                "revisionId": revision_id,
                "tableId": table_id,
                "first": page.first,
                "after": page.after,
            }),
            "rows",
        )
        .await
    }

    async fn create_rows(
        &self,
        revision_id: &str,
        table_id: &str,
        rows: &[RowRecord],
    ) -> ApiResult<()> {
        let _: Value = self
            .execute(
                "CreateRows",
                queries::CREATE_ROWS,
                json!({ "revisionId": revision_id, "tableId": table_id, "rows": rows }),
                "createRows",
            )
            .await?;
        Ok(())
    }

    async fn update_rows(
        &self,
        revision_id: &str,
        table_id: &str,
        rows: &[RowRecord],
    ) -> ApiResult<()> {
        let _: Value = self
            .execute(
                "UpdateRows",
                queries::UPDATE_ROWS,
                json!({ "revisionId": revision_id, "tableId": table_id, "rows": rows }),
                "updateRows",
            )
            .await?;
        Ok(())
    }

    async fn create_revision(&self, project: &ProjectRef, comment: &str) -> ApiResult<RevisionInfo> {
        self.execute(
            "CreateRevision",
            queries::CREATE_REVISION,
            json!({
                "organizationId": project.organization,
                "projectName": project.project,
                "branchName": project.branch,
                "comment": comment,
            }),
            "createRevision",
        )
        .await
    }

    async fn get_migrations(&self, revision_id: &str) -> ApiResult<Vec<Migration>> {
        self.execute(
            "Migrations",
            queries::MIGRATIONS,
            json!({ "revisionId": revision_id }),
            "migrations",
        )
        .await
    }

    async fn apply_migration(
        &self,
        revision_id: &str,
        migration: &Migration,
    ) -> ApiResult<MigrationResult> {
        self.execute(
            "ApplyMigration",
            queries::APPLY_MIGRATION,
            json!({ "revisionId": revision_id, "migration": migration }),
            "applyMigration",
        )
        .await
    }
}
