//! Fatal row transfer errors

use thiserror::Error;

use super::stats::UploadStats;
use crate::api::ApiError;

/// Which step of a table pass failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    Fetch,
    Create,
    Update,
}

impl BatchOperation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

impl std::fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "no HTTP status".to_string(),
    }
}

/// A batch call failed; the rest of the table (and run) was not attempted
#[derive(Error, Debug, Clone)]
#[error(
    "Failed to {operation} rows in table '{table_id}' (batch size {batch_size}, {status}): {message}",
    status = status_label(.status_code)
)]
pub struct RowSyncError {
    pub table_id: String,
    pub operation: BatchOperation,
    pub message: String,
    pub status_code: Option<u16>,
    pub batch_size: usize,
    /// Progress of the table up to the failure
    pub partial: UploadStats,
}

impl RowSyncError {
    pub fn from_api(
        table_id: &str,
        operation: BatchOperation,
        batch_size: usize,
        error: &ApiError,
        partial: UploadStats,
    ) -> Self {
        Self {
            table_id: table_id.to_string(),
            operation,
            message: error.message(),
            status_code: error.status_code(),
            batch_size,
            partial,
        }
    }

    pub fn is_payload_too_large(&self) -> bool {
        self.status_code == Some(413)
    }

    /// Actionable advice for the operator, when there is any
    pub fn guidance(&self) -> Option<String> {
        if self.is_payload_too_large() {
            let smaller = (self.batch_size / 2).max(1);
            return Some(format!(
                "The server rejected a batch of {} rows for table '{}' as too large (HTTP 413). \
                 Re-run with a smaller batch, e.g. --batch-size {}.",
                self.batch_size, self.table_id, smaller
            ));
        }

        match self.status_code {
            Some(401) | Some(403) => Some(
                "The target rejected the credentials. Check the token of the target connection."
                    .to_string(),
            ),
            None if self.operation != BatchOperation::Fetch => Some(format!(
                "Rows already sent for table '{}' remain in the draft. Re-running is safe: \
                 unchanged rows are skipped.",
                self.table_id
            )),
            _ => None,
        }
    }
}
