use crate::types::{
    ColumnUsage, DatabaseSchemaSnapshot, Severity, Suggestion, SuggestionKind, SuggestionStatus,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("suggestion {0} not found")]
    SuggestionNotFound(i64),
    #[error("cannot move suggestion from {from} to {to}")]
    InvalidTransition {
        from: SuggestionStatus,
        to: SuggestionStatus,
    },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt snapshot payload: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A persisted snapshot row: append-only, never updated in place.
#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub id: i64,
    pub project: String,
    pub created_at: DateTime<Utc>,
    pub snapshot: DatabaseSchemaSnapshot,
}

const SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project TEXT NOT NULL,
        created_at TEXT NOT NULL,
        data TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS snapshots_project ON snapshots (project, created_at);
    CREATE TABLE IF NOT EXISTS suggestions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project TEXT NOT NULL,
        table_id TEXT NOT NULL,
        table_name TEXT NOT NULL,
        column_name TEXT,
        severity TEXT NOT NULL,
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        impact TEXT,
        code_references TEXT NOT NULL DEFAULT '[]',
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS advice_runs (
        project TEXT PRIMARY KEY,
        last_generated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS column_usage (
        project TEXT NOT NULL,
        table_name TEXT NOT NULL,
        column_name TEXT NOT NULL,
        last_used_at TEXT,
        source_path TEXT,
        PRIMARY KEY (project, table_name, column_name)
    );";

/// Local persistence for snapshots, suggestions, and usage rows
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .with_context(|| format!("failed to open store: {}", path.as_ref().display()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("failed to set busy timeout")?;
        conn.execute_batch(SCHEMA).context("failed to migrate store")?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Append a new snapshot for a project. Prior snapshots stay as they
    /// are; racing syncs simply both land and the newest wins on read.
    pub fn insert_snapshot(
        &self,
        project: &str,
        snapshot: &DatabaseSchemaSnapshot,
    ) -> Result<i64, StoreError> {
        let data = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO snapshots (project, created_at, data) VALUES (?1, ?2, ?3)",
            params![project, Utc::now().to_rfc3339(), data],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(project, snapshot_id = id, tables = snapshot.tables.len(), "snapshot stored");
        Ok(id)
    }

    /// Newest snapshot for a project by creation timestamp.
    pub fn latest_snapshot(&self, project: &str) -> Result<Option<SnapshotRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project, created_at, data FROM snapshots
             WHERE project = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![project])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let created_at: String = row.get(2)?;
        let data: String = row.get(3)?;
        Ok(Some(SnapshotRow {
            id: row.get(0)?,
            project: row.get(1)?,
            created_at: created_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            snapshot: serde_json::from_str(&data)?,
        }))
    }

    /// Insert suggestions, skipping any already present under the
    /// composite key (project, table, column, kind). Returns how many
    /// were actually inserted.
    pub fn insert_suggestions(
        &mut self,
        project: &str,
        suggestions: &[Suggestion],
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for suggestion in suggestions {
            let seen: bool = tx.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM suggestions
                     WHERE project = ?1 AND table_name = ?2
                       AND column_name IS ?3 AND kind = ?4
                 )",
                params![
                    project,
                    suggestion.table_name,
                    suggestion.column_name,
                    suggestion.kind.as_str()
                ],
                |row| row.get(0),
            )?;
            if seen {
                debug!(
                    table = %suggestion.table_name,
                    kind = %suggestion.kind,
                    "suggestion already present, skipping"
                );
                continue;
            }
            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO suggestions
                 (project, table_id, table_name, column_name, severity, kind,
                  title, description, impact, code_references, status,
                  created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    project,
                    suggestion.table_id,
                    suggestion.table_name,
                    suggestion.column_name,
                    suggestion.severity.as_str(),
                    suggestion.kind.as_str(),
                    suggestion.title,
                    suggestion.description,
                    suggestion.impact,
                    serde_json::to_string(&suggestion.code_references)?,
                    SuggestionStatus::Pending.as_str(),
                    now,
                ],
            )?;
            inserted += 1;
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn list_suggestions(
        &self,
        project: &str,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, table_id, table_name, column_name, severity, kind,
                    title, description, impact, code_references, status,
                    created_at, updated_at
             FROM suggestions
             WHERE project = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![project, status.map(|s| s.as_str())], read_suggestion)?;
        let mut suggestions = Vec::new();
        for row in rows {
            suggestions.push(row?);
        }
        Ok(suggestions)
    }

    /// Apply a status transition, stamping `updated_at`. Illegal moves
    /// are rejected and nothing is written.
    pub fn set_suggestion_status(
        &self,
        id: i64,
        next: SuggestionStatus,
    ) -> Result<Suggestion, StoreError> {
        let current: SuggestionStatus = self
            .conn
            .query_row(
                "SELECT status FROM suggestions WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .map(|s| SuggestionStatus::parse(&s).unwrap_or(SuggestionStatus::Pending))
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::SuggestionNotFound(id),
                other => StoreError::Sqlite(other),
            })?;

        if !current.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        self.conn.execute(
            "UPDATE suggestions SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![next.as_str(), Utc::now().to_rfc3339(), id],
        )?;
        self.conn
            .query_row(
                "SELECT id, table_id, table_name, column_name, severity, kind,
                        title, description, impact, code_references, status,
                        created_at, updated_at
                 FROM suggestions WHERE id = ?1",
                params![id],
                read_suggestion,
            )
            .map_err(StoreError::Sqlite)
    }

    pub fn last_advice_run(&self, project: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT last_generated_at FROM advice_runs WHERE project = ?1")?;
        let mut rows = stmt.query(params![project])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let stamp: String = row.get(0)?;
        Ok(stamp.parse::<DateTime<Utc>>().ok())
    }

    pub fn record_advice_run(&self, project: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO advice_runs (project, last_generated_at) VALUES (?1, ?2)
             ON CONFLICT(project) DO UPDATE SET last_generated_at = excluded.last_generated_at",
            params![project, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Upsert code-usage observations for a project.
    pub fn upsert_usage(&mut self, project: &str, rows: &[ColumnUsage]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for row in rows {
            tx.execute(
                "INSERT INTO column_usage
                 (project, table_name, column_name, last_used_at, source_path)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(project, table_name, column_name) DO UPDATE SET
                     last_used_at = excluded.last_used_at,
                     source_path = excluded.source_path",
                params![
                    project,
                    row.table_name,
                    row.column_name,
                    row.last_used_at.map(|t| t.to_rfc3339()),
                    row.source_path,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_usage(&self, project: &str) -> Result<Vec<ColumnUsage>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name, column_name, last_used_at, source_path
             FROM column_usage WHERE project = ?1
             ORDER BY table_name, column_name",
        )?;
        let rows = stmt.query_map(params![project], |row| {
            let last_used_at: Option<String> = row.get(2)?;
            Ok(ColumnUsage {
                table_name: row.get(0)?,
                column_name: row.get(1)?,
                last_used_at: last_used_at.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
                source_path: row.get(3)?,
            })
        })?;
        let mut usage = Vec::new();
        for row in rows {
            usage.push(row?);
        }
        Ok(usage)
    }
}

/// Read code-usage rows from a CSV file with the header
/// `table_name,column_name,last_used_at,source_path`.
pub fn read_usage_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ColumnUsage>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("failed to open usage CSV: {}", path.as_ref().display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<ColumnUsage>() {
        rows.push(record.context("malformed usage CSV row")?);
    }
    Ok(rows)
}

fn read_suggestion(row: &rusqlite::Row<'_>) -> rusqlite::Result<Suggestion> {
    let severity: String = row.get(4)?;
    let kind: String = row.get(5)?;
    let code_references: String = row.get(9)?;
    let status: String = row.get(10)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;
    Ok(Suggestion {
        id: row.get(0)?,
        table_id: row.get(1)?,
        table_name: row.get(2)?,
        column_name: row.get(3)?,
        severity: Severity::parse(&severity),
        kind: SuggestionKind::parse(&kind),
        title: row.get(6)?,
        description: row.get(7)?,
        impact: row.get(8)?,
        code_references: serde_json::from_str(&code_references).unwrap_or_default(),
        status: SuggestionStatus::parse(&status).unwrap_or(SuggestionStatus::Pending),
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableSchema;

    fn snapshot(tables: &[&str]) -> DatabaseSchemaSnapshot {
        DatabaseSchemaSnapshot {
            tables: tables
                .iter()
                .map(|name| TableSchema::new("public", *name))
                .collect(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    fn suggestion(table: &str, column: Option<&str>, kind: SuggestionKind) -> Suggestion {
        Suggestion {
            id: 0,
            table_id: table.to_string(),
            table_name: table.to_string(),
            column_name: column.map(String::from),
            severity: Severity::Warning,
            kind,
            title: "add an index".to_string(),
            description: "this FK column has no covering index".to_string(),
            impact: Some("slow joins".to_string()),
            code_references: vec!["src/queries.ts:40".to_string()],
            status: SuggestionStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn snapshots_are_append_only_and_latest_wins() {
        let store = Store::open_in_memory().unwrap();
        let first = store.insert_snapshot("proj", &snapshot(&["users"])).unwrap();
        let second = store
            .insert_snapshot("proj", &snapshot(&["users", "posts"]))
            .unwrap();
        assert_ne!(first, second);

        let latest = store.latest_snapshot("proj").unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.snapshot.tables.len(), 2);
        assert!(store.latest_snapshot("other").unwrap().is_none());
    }

    #[test]
    fn repeated_generation_does_not_duplicate() {
        let mut store = Store::open_in_memory().unwrap();
        let batch = vec![
            suggestion("posts", Some("user_id"), SuggestionKind::MissingIndex),
            suggestion("posts", None, SuggestionKind::RlsGap),
        ];
        assert_eq!(store.insert_suggestions("proj", &batch).unwrap(), 2);
        assert_eq!(store.insert_suggestions("proj", &batch).unwrap(), 0);
        // same table+kind but different column is a different suggestion
        let other_column = vec![suggestion(
            "posts",
            Some("tenant_id"),
            SuggestionKind::MissingIndex,
        )];
        assert_eq!(store.insert_suggestions("proj", &other_column).unwrap(), 1);
        assert_eq!(store.list_suggestions("proj", None).unwrap().len(), 3);
    }

    #[test]
    fn status_transitions_are_validated_and_stamped() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert_suggestions(
                "proj",
                &[suggestion("posts", None, SuggestionKind::Performance)],
            )
            .unwrap();
        let pending = store.list_suggestions("proj", None).unwrap().remove(0);

        let applied = store
            .set_suggestion_status(pending.id, SuggestionStatus::Applied)
            .unwrap();
        assert_eq!(applied.status, SuggestionStatus::Applied);
        assert!(applied.updated_at >= pending.updated_at);

        let err = store
            .set_suggestion_status(pending.id, SuggestionStatus::Dismissed)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let archived = store
            .set_suggestion_status(pending.id, SuggestionStatus::Archived)
            .unwrap();
        assert_eq!(archived.status, SuggestionStatus::Archived);
    }

    #[test]
    fn unknown_suggestion_id_is_reported() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .set_suggestion_status(99, SuggestionStatus::Applied)
            .unwrap_err();
        assert!(matches!(err, StoreError::SuggestionNotFound(99)));
    }

    #[test]
    fn status_filter_narrows_listing() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert_suggestions(
                "proj",
                &[
                    suggestion("posts", None, SuggestionKind::Performance),
                    suggestion("users", None, SuggestionKind::RlsGap),
                ],
            )
            .unwrap();
        let all = store.list_suggestions("proj", None).unwrap();
        store
            .set_suggestion_status(all[0].id, SuggestionStatus::Dismissed)
            .unwrap();
        let pending = store
            .list_suggestions("proj", Some(SuggestionStatus::Pending))
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].table_name, "users");
    }

    #[test]
    fn advice_runs_round_trip() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.last_advice_run("proj").unwrap().is_none());
        let at = Utc::now();
        store.record_advice_run("proj", at).unwrap();
        let read = store.last_advice_run("proj").unwrap().unwrap();
        assert!((read - at).num_seconds().abs() < 1);
    }

    #[test]
    fn usage_rows_upsert_and_list() {
        let mut store = Store::open_in_memory().unwrap();
        let mut row = ColumnUsage {
            table_name: "posts".to_string(),
            column_name: "title".to_string(),
            last_used_at: Some(Utc::now()),
            source_path: Some("src/a.ts".to_string()),
        };
        store.upsert_usage("proj", std::slice::from_ref(&row)).unwrap();
        row.source_path = Some("src/b.ts".to_string());
        store.upsert_usage("proj", std::slice::from_ref(&row)).unwrap();

        let listed = store.list_usage("proj").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source_path.as_deref(), Some("src/b.ts"));
    }
}
