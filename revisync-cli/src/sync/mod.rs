//! Schema and data synchronization between revisioned projects

pub mod commit;
pub mod dependency_graph;
pub mod diff;
pub mod engine;
pub mod error;
pub mod export;
pub mod migrations;
pub mod orchestrator;
pub mod schema;
pub mod source;
pub mod stats;

pub use commit::{CommitOutcome, commit_if_needed};
pub use engine::{ProgressFn, SyncOptions, SyncProgress};
pub use error::RowSyncError;
pub use export::{ExportStats, export_migrations, export_rows};
pub use migrations::{
    MigrationError, MigrationStats, apply_migrations, load_migrations_file, sync_schema,
};
pub use orchestrator::{DataSyncError, DataSyncOptions, sync_data};
pub use source::{ApiRowSource, FileRowSource, RowSource};
pub use stats::{RunStats, UploadStats};
