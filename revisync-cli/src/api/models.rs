//! Project data models shared by clients, sources and the sync engine

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Organization / project / branch triple identifying a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub organization: String,
    pub project: String,
    pub branch: String,
}

impl std::fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.organization, self.project, self.branch)
    }
}

/// Revision ids of a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRevisions {
    /// Latest committed, immutable revision
    pub head_revision_id: String,
    /// Mutable revision accumulating uncommitted changes
    pub draft_revision_id: String,
}

/// Table listed in a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: String,
}

/// A single row: unique id within its table plus its JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub id: String,
    pub data: Value,
}

impl RowRecord {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Created revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    pub id: String,
}

/// Kind of schema change carried by a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Init,
    Update,
    Rename,
    Remove,
}

impl ChangeType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Update => "update",
            Self::Rename => "rename",
            Self::Remove => "remove",
        }
    }
}

/// A replay-safe schema change
///
/// Only the identifying fields are typed; the rest of the payload (schema,
/// patches, new table id, ...) is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub change_type: ChangeType,
    pub table_id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Outcome status reported by the backend for one migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Applied,
    Skipped,
    Failed,
}

/// Result of applying one migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub id: String,
    pub status: MigrationStatus,
    #[serde(default)]
    pub error: Option<String>,
}
