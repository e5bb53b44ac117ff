//! Commit finalization: turn draft changes into a revision

use anyhow::{Context, Result};
use log::{info, warn};

use crate::api::{Connection, RevisionInfo};

/// Name used in generated revision comments
pub const TOOL_NAME: &str = "revisync";

/// The revision created by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub revision_id: String,
}

/// Outcome of [`commit_if_needed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing changed
    NoChanges,
    /// Changes exist but no commit was requested
    LeftInDraft { changes: usize },
    Committed(CommitRecord),
}

pub fn commit_comment(action_label: &str, change_count: usize) -> String {
    format!("{} {} item(s) via {}", action_label, change_count, TOOL_NAME)
}

/// Create a revision on the target branch if there is something to commit
///
/// Issues at most one `create_revision` call. A failure is returned as is;
/// the draft keeps every change already written.
pub async fn commit_if_needed(
    target: &Connection,
    requested: bool,
    action_label: &str,
    change_count: usize,
) -> Result<CommitOutcome> {
    if change_count == 0 {
        return Ok(CommitOutcome::NoChanges);
    }

    if !requested {
        warn!(
            "{} change(s) remain in the draft of {}; re-run with --commit to create a revision",
            change_count,
            target.project()
        );
        return Ok(CommitOutcome::LeftInDraft {
            changes: change_count,
        });
    }

    let comment = commit_comment(action_label, change_count);
    let RevisionInfo { id } = target
        .client()
        .create_revision(target.project(), &comment)
        .await
        .with_context(|| format!("Failed to create revision on {}", target.project()))?;

    info!("Created revision {} ({})", id, comment);
    Ok(CommitOutcome::Committed(CommitRecord { revision_id: id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryProject;
    use crate::api::{ApiError, RevisionSelector};
    use std::sync::Arc;

    async fn target() -> (Arc<MemoryProject>, Connection) {
        let project = MemoryProject::new();
        let conn = Connection::open(
            project.clone(),
            MemoryProject::project_ref(),
            RevisionSelector::Draft,
        )
        .await
        .unwrap();
        project.clear_calls();
        (project, conn)
    }

    #[test]
    fn test_comment_format() {
        assert_eq!(commit_comment("Uploaded", 3), "Uploaded 3 item(s) via revisync");
    }

    #[tokio::test]
    async fn test_no_changes_is_noop_even_when_requested() {
        let (project, conn) = target().await;
        let outcome = commit_if_needed(&conn, true, "Uploaded", 0).await.unwrap();
        assert_eq!(outcome, CommitOutcome::NoChanges);
        assert!(project.calls().is_empty());
    }

    #[tokio::test]
    async fn test_changes_without_request_stay_in_draft() {
        let (project, conn) = target().await;
        let outcome = commit_if_needed(&conn, false, "Uploaded", 4).await.unwrap();
        assert_eq!(outcome, CommitOutcome::LeftInDraft { changes: 4 });
        assert_eq!(project.calls_named("create_revision"), 0);
    }

    #[tokio::test]
    async fn test_requested_commit_creates_one_revision() {
        let (project, conn) = target().await;
        let outcome = commit_if_needed(&conn, true, "Synced", 12).await.unwrap();

        assert!(matches!(outcome, CommitOutcome::Committed(ref r) if r.revision_id == "head-1"));
        assert_eq!(project.calls_named("create_revision"), 1);
        assert_eq!(project.commits(), vec!["Synced 12 item(s) via revisync"]);
    }

    #[tokio::test]
    async fn test_commit_failure_is_not_retried() {
        let (project, conn) = target().await;
        project.fail_commit(ApiError::Http {
            status: 500,
            message: "boom".to_string(),
        });

        let err = commit_if_needed(&conn, true, "Uploaded", 1).await.unwrap_err();
        assert!(err.to_string().contains("Failed to create revision"));
        assert_eq!(project.calls_named("create_revision"), 1);
    }
}
