//! Best-effort export of a remote revision to the file-tree layout

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

use super::migrations::save_migrations_file;
use super::source::RowSource;
use crate::api::{Connection, RowRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub tables: usize,
    pub rows: usize,
    /// Rows whose id cannot be used as a file name
    pub skipped_rows: usize,
    pub failed_tables: Vec<String>,
}

fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
}

fn write_row(dir: &Path, row: &RowRecord) -> Result<()> {
    let path = dir.join(format!("{}.json", row.id));
    let body: Value = json!({ "id": row.id, "data": row.data });
    fs::write(&path, serde_json::to_string_pretty(&body)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn export_table(source: &dyn RowSource, folder: &Path, table_id: &str) -> Result<(usize, usize)> {
    let loaded = source.load_rows(table_id, None).await?;
    let dir = folder.join(table_id);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut skipped = 0;
    for row in &loaded.rows {
        if !is_safe_file_stem(&row.id) {
            warn!("Row id '{}' in '{}' is not a valid file name, skipping", row.id, table_id);
            skipped += 1;
            continue;
        }
        write_row(&dir, row)?;
    }
    Ok((loaded.rows.len() - skipped, skipped))
}

/// Write every table of `source` under `folder`
///
/// A table that cannot be read or written is logged and recorded in
/// [`ExportStats::failed_tables`]; the remaining tables are still exported.
pub async fn export_rows(
    source: &dyn RowSource,
    folder: &Path,
    tables: Option<&[String]>,
) -> Result<ExportStats> {
    let table_ids = source.list_tables(tables).await?;
    fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create directory: {}", folder.display()))?;

    let mut stats = ExportStats::default();
    for table_id in &table_ids {
        match export_table(source, folder, table_id).await {
            Ok((rows, skipped)) => {
                debug!("Exported {} row(s) of '{}'", rows, table_id);
                stats.tables += 1;
                stats.rows += rows;
                stats.skipped_rows += skipped;
            }
            Err(err) => {
                warn!("Failed to export table '{}': {:#}", table_id, err);
                stats.failed_tables.push(table_id.clone());
            }
        }
    }

    info!(
        "Exported {} row(s) from {} table(s) of {} to {}",
        stats.rows,
        stats.tables,
        source.describe(),
        folder.display()
    );
    Ok(stats)
}

/// Save the migration history of the connection's read revision
pub async fn export_migrations(source: &Connection, path: &Path) -> Result<usize> {
    let migrations = source
        .client()
        .get_migrations(source.read_revision_id())
        .await
        .context("Failed to read migrations")?;
    save_migrations_file(path, &migrations)?;
    info!("Saved {} migration(s) to {}", migrations.len(), path.display());
    Ok(migrations.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RevisionSelector;
    use crate::api::memory::MemoryProject;
    use crate::sync::migrations::load_migrations_file;
    use crate::sync::source::{ApiRowSource, FileRowSource, LoadedRows, RowValidator};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn connect(project: &Arc<MemoryProject>) -> Connection {
        Connection::open(
            project.clone(),
            MemoryProject::project_ref(),
            RevisionSelector::Head,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_file_stem_check() {
        assert!(is_safe_file_stem("hero-1"));
        assert!(!is_safe_file_stem("../etc"));
        assert!(!is_safe_file_stem(".."));
        assert!(!is_safe_file_stem(""));
    }

    #[tokio::test]
    async fn test_export_is_readable_as_row_source() {
        let project = MemoryProject::new();
        project.add_table("stats", json!({"type": "object"}));
        project.add_table("items", json!({"type": "object"}));
        project.insert_row("stats", "s1", json!({"hp": 10}));
        project.insert_row("stats", "s2", json!({"hp": 20}));
        project.insert_row("items", "sword", json!({"name": "Sword"}));
        let conn = connect(&project).await;

        let tmp = TempDir::new().unwrap();
        let stats = export_rows(&ApiRowSource::new(&conn), tmp.path(), None)
            .await
            .unwrap();
        assert_eq!(stats.tables, 2);
        assert_eq!(stats.rows, 3);
        assert!(stats.failed_tables.is_empty());

        let files = FileRowSource::new(tmp.path());
        let loaded = files.load_rows("stats", None).await.unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].id, "s1");
        assert_eq!(loaded.rows[0].data, json!({"hp": 10}));
    }

    #[tokio::test]
    async fn test_missing_table_does_not_stop_export() {
        let project = MemoryProject::new();
        project.add_table("stats", json!({"type": "object"}));
        project.insert_row("stats", "s1", json!({}));
        let conn = connect(&project).await;

        // Lists a table the project does not have
        struct Flaky<'a>(ApiRowSource<'a>);

        #[async_trait::async_trait]
        impl RowSource for Flaky<'_> {
            fn describe(&self) -> String {
                self.0.describe()
            }
            async fn list_tables(&self, _scope: Option<&[String]>) -> Result<Vec<String>> {
                Ok(vec!["ghost".to_string(), "stats".to_string()])
            }
            async fn load_rows(
                &self,
                table_id: &str,
                validator: Option<&RowValidator>,
            ) -> Result<LoadedRows> {
                self.0.load_rows(table_id, validator).await
            }
        }

        let tmp = TempDir::new().unwrap();
        let stats = export_rows(&Flaky(ApiRowSource::new(&conn)), tmp.path(), None)
            .await
            .unwrap();

        assert_eq!(stats.failed_tables, vec!["ghost"]);
        assert_eq!(stats.tables, 1);
        assert!(tmp.path().join("stats").join("s1.json").is_file());
    }

    #[tokio::test]
    async fn test_export_migrations() {
        let project = MemoryProject::new();
        project.add_migration(crate::api::Migration {
            id: "m1".to_string(),
            hash: None,
            change_type: crate::api::models::ChangeType::Init,
            table_id: "stats".to_string(),
            payload: serde_json::Map::new(),
        });
        let conn = connect(&project).await;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("migrations.json");
        assert_eq!(export_migrations(&conn, &path).await.unwrap(), 1);
        assert_eq!(load_migrations_file(&path).unwrap()[0].id, "m1");
    }
}
