use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A table as seen by introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema: String,
    pub table_name: String,
    pub row_estimate: Option<u64>,
    pub description: Option<String>,
}

impl TableSchema {
    pub fn new(schema: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table_name: table_name.into(),
            row_estimate: None,
            description: None,
        }
    }
}

/// A column of an introspected table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub schema: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
    pub is_primary_key: bool,
    /// "table.column" when a foreign key was resolved (authoritative or
    /// heuristic); absence means no FK or an unresolved heuristic.
    pub foreign_key_to: Option<String>,
    /// Whether some index covers this column. Only trustworthy when a
    /// privileged introspection path populated indexes.
    pub indexed: bool,
    /// Last observed use of this column in application code, if known.
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ColumnSchema {
    /// FK column without a covering index: prime candidate for advice.
    pub fn needs_index(&self) -> bool {
        self.foreign_key_to.is_some() && !self.indexed
    }

    /// Unused for over a year.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.last_used_at {
            Some(last) => (now - last).num_days() > 365,
            None => false,
        }
    }
}

/// Observed use of a column in application code; feeds staleness
/// detection and gives the advice generator usage context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUsage {
    pub table_name: String,
    pub column_name: String,
    pub last_used_at: Option<DateTime<Utc>>,
    pub source_path: Option<String>,
}

/// An index on a table. Only populated when the privileged catalog
/// path succeeds; otherwise the snapshot carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub schema: String,
    pub table_name: String,
    pub index_name: String,
    pub is_unique: bool,
    pub is_primary: bool,
    pub columns: Vec<String>,
}

/// Immutable point-in-time capture of a database's structure.
///
/// One snapshot belongs to one project and one sync; newer syncs append
/// new snapshots rather than mutating old ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchemaSnapshot {
    pub tables: Vec<TableSchema>,
    pub columns: Vec<ColumnSchema>,
    pub indexes: Vec<IndexSchema>,
}

impl DatabaseSchemaSnapshot {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table_name.as_str()).collect()
    }

    pub fn columns_for(&self, table_name: &str) -> Vec<&ColumnSchema> {
        self.columns
            .iter()
            .filter(|c| c.table_name == table_name)
            .collect()
    }

    pub fn indexes_for(&self, table_name: &str) -> Vec<&IndexSchema> {
        self.indexes
            .iter()
            .filter(|i| i.table_name == table_name)
            .collect()
    }

    /// Fold code-usage observations into the columns. The newest
    /// observation per column wins.
    pub fn apply_usage(&mut self, usage: &[ColumnUsage]) {
        for row in usage {
            let Some(column) = self.columns.iter_mut().find(|c| {
                c.table_name == row.table_name && c.column_name == row.column_name
            }) else {
                continue;
            };
            match (column.last_used_at, row.last_used_at) {
                (None, Some(seen)) => column.last_used_at = Some(seen),
                (Some(have), Some(seen)) if seen > have => column.last_used_at = Some(seen),
                _ => {}
            }
        }
    }
}
