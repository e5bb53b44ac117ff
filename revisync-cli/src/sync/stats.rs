//! Upload counters per table and per run

use serde::Serialize;
use std::ops::AddAssign;

/// Counters of one table pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub invalid_schema: usize,
    pub create_errors: usize,
    pub update_errors: usize,
    pub other_errors: usize,
}

impl UploadStats {
    /// Rows written (or, in a dry run, rows that would be written)
    pub fn changes(&self) -> usize {
        self.created + self.updated
    }
}

impl AddAssign for UploadStats {
    fn add_assign(&mut self, other: Self) {
        self.total_rows += other.total_rows;
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.invalid_schema += other.invalid_schema;
        self.create_errors += other.create_errors;
        self.update_errors += other.update_errors;
        self.other_errors += other.other_errors;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub table_id: String,
    pub stats: UploadStats,
}

/// Counters of a whole run, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub totals: UploadStats,
    pub tables: Vec<TableStats>,
    /// Non-fatal problems worth showing in the summary (cycles, skipped tables)
    pub warnings: Vec<String>,
}

impl RunStats {
    /// Add a table's counters; they are never reset afterwards
    pub fn record(&mut self, table_id: &str, stats: UploadStats) {
        self.totals += stats;
        self.tables.push(TableStats {
            table_id: table_id.to_string(),
            stats,
        });
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn changes(&self) -> usize {
        self.totals.changes()
    }

    pub fn table(&self, table_id: &str) -> Option<&UploadStats> {
        self.tables
            .iter()
            .find(|t| t.table_id == table_id)
            .map(|t| &t.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_stats_accumulate() {
        let mut run = RunStats::default();
        run.record(
            "abilities",
            UploadStats {
                total_rows: 5,
                created: 3,
                skipped: 2,
                ..Default::default()
            },
        );
        run.record(
            "quests",
            UploadStats {
                total_rows: 4,
                updated: 1,
                skipped: 2,
                invalid_schema: 1,
                ..Default::default()
            },
        );

        assert_eq!(run.totals.total_rows, 9);
        assert_eq!(run.totals.skipped, 4);
        assert_eq!(run.changes(), 4);
        assert_eq!(run.totals.invalid_schema, 1);
        assert_eq!(run.table("quests").unwrap().updated, 1);
        assert_eq!(run.tables[0].table_id, "abilities");
        assert!(run.table("ghost").is_none());
    }
}
