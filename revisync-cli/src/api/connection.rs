//! Explicit connection to one project branch
//!
//! A [`Connection`] bundles a client with the resolved revision ids of a
//! branch. Commands open one per side (source, target) and pass them by
//! reference into the orchestrators; there is no process-wide connection.

use std::sync::Arc;

use log::debug;

use super::client::ProjectClient;
use super::error::ApiResult;
use super::models::{BranchRevisions, ProjectRef, RowRecord};
use super::pagination::{DEFAULT_PAGE_SIZE, fetch_all};

/// Which revision of the branch reads come from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RevisionSelector {
    #[default]
    Draft,
    Head,
    Id(String),
}

impl RevisionSelector {
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "draft" => Self::Draft,
            "head" => Self::Head,
            other => Self::Id(other.to_string()),
        }
    }
}

pub struct Connection {
    client: Arc<dyn ProjectClient>,
    project: ProjectRef,
    revisions: BranchRevisions,
    read_revision_id: String,
    page_size: usize,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("project", &self.project)
            .field("revisions", &self.revisions)
            .field("read_revision_id", &self.read_revision_id)
            .finish()
    }
}

impl Connection {
    /// Resolve the branch revisions and build a connection
    pub async fn open(
        client: Arc<dyn ProjectClient>,
        project: ProjectRef,
        selector: RevisionSelector,
    ) -> ApiResult<Self> {
        let revisions = client.get_branch(&project).await?;
        let read_revision_id = match selector {
            RevisionSelector::Draft => revisions.draft_revision_id.clone(),
            RevisionSelector::Head => revisions.head_revision_id.clone(),
            RevisionSelector::Id(id) => id,
        };

        debug!(
            "Connected to {} (head {}, draft {}, reading {})",
            project, revisions.head_revision_id, revisions.draft_revision_id, read_revision_id
        );

        Ok(Self {
            client,
            project,
            revisions,
            read_revision_id,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn client(&self) -> &dyn ProjectClient {
        self.client.as_ref()
    }

    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    /// Revision reads (export, source side of a sync) come from
    pub fn read_revision_id(&self) -> &str {
        &self.read_revision_id
    }

    /// Revision every write lands in
    pub fn draft_revision_id(&self) -> &str {
        &self.revisions.draft_revision_id
    }

    /// All table ids of a revision in backend order
    pub async fn list_table_ids(&self, revision_id: &str) -> ApiResult<Vec<String>> {
        let tables = fetch_all(
            self.page_size,
            move |page| self.client.list_tables(revision_id, page),
            |_, _| {},
        )
        .await?;
        Ok(tables.into_iter().map(|t| t.id).collect())
    }

    /// All rows of a table, following pagination to the end
    pub async fn list_all_rows(
        &self,
        revision_id: &str,
        table_id: &str,
        on_page: impl FnMut(usize, usize),
    ) -> ApiResult<Vec<RowRecord>> {
        fetch_all(
            self.page_size,
            move |page| self.client.list_rows(revision_id, table_id, page),
            on_page,
        )
        .await
    }
}
