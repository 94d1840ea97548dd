use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an optimization suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Severity {
        match s {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a suggestion; part of the dedup key together with the
/// project, table, and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    MissingIndex,
    UnusedColumn,
    RlsGap,
    Performance,
    Schema,
    #[serde(other)]
    Other,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::MissingIndex => "missing_index",
            SuggestionKind::UnusedColumn => "unused_column",
            SuggestionKind::RlsGap => "rls_gap",
            SuggestionKind::Performance => "performance",
            SuggestionKind::Schema => "schema",
            SuggestionKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> SuggestionKind {
        match s {
            "missing_index" => SuggestionKind::MissingIndex,
            "unused_column" => SuggestionKind::UnusedColumn,
            "rls_gap" => SuggestionKind::RlsGap,
            "performance" => SuggestionKind::Performance,
            "schema" => SuggestionKind::Schema,
            _ => SuggestionKind::Other,
        }
    }
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a suggestion.
///
/// Applied and dismissed are terminal decisions reachable only from
/// pending; archived is reachable from any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Applied,
    Dismissed,
    Archived,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Applied => "applied",
            SuggestionStatus::Dismissed => "dismissed",
            SuggestionStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<SuggestionStatus> {
        match s {
            "pending" => Some(SuggestionStatus::Pending),
            "applied" => Some(SuggestionStatus::Applied),
            "dismissed" => Some(SuggestionStatus::Dismissed),
            "archived" => Some(SuggestionStatus::Archived),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: SuggestionStatus) -> bool {
        match (self, next) {
            (SuggestionStatus::Pending, SuggestionStatus::Applied)
            | (SuggestionStatus::Pending, SuggestionStatus::Dismissed) => true,
            (from, SuggestionStatus::Archived) => *from != SuggestionStatus::Archived,
            _ => false,
        }
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An LLM-generated optimization recommendation tied to a table/column.
///
/// Suggestions reference a snapshot informally by table/column name, not
/// by id; renaming a column can orphan its suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub table_id: String,
    pub table_name: String,
    pub column_name: Option<String>,
    pub severity: Severity,
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub impact: Option<String>,
    #[serde(default)]
    pub code_references: Vec<String>,
    #[serde(default = "default_status")]
    pub status: SuggestionStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_status() -> SuggestionStatus {
    SuggestionStatus::Pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_decisions_only_from_pending() {
        assert!(SuggestionStatus::Pending.can_transition_to(SuggestionStatus::Applied));
        assert!(SuggestionStatus::Pending.can_transition_to(SuggestionStatus::Dismissed));
        assert!(!SuggestionStatus::Applied.can_transition_to(SuggestionStatus::Dismissed));
        assert!(!SuggestionStatus::Dismissed.can_transition_to(SuggestionStatus::Applied));
        assert!(!SuggestionStatus::Applied.can_transition_to(SuggestionStatus::Pending));
    }

    #[test]
    fn archive_reachable_from_everything_but_itself() {
        assert!(SuggestionStatus::Pending.can_transition_to(SuggestionStatus::Archived));
        assert!(SuggestionStatus::Applied.can_transition_to(SuggestionStatus::Archived));
        assert!(SuggestionStatus::Dismissed.can_transition_to(SuggestionStatus::Archived));
        assert!(!SuggestionStatus::Archived.can_transition_to(SuggestionStatus::Archived));
    }

    #[test]
    fn kind_round_trips_through_text() {
        for kind in [
            SuggestionKind::MissingIndex,
            SuggestionKind::UnusedColumn,
            SuggestionKind::RlsGap,
            SuggestionKind::Performance,
            SuggestionKind::Schema,
        ] {
            assert_eq!(SuggestionKind::parse(kind.as_str()), kind);
        }
        assert_eq!(SuggestionKind::parse("who_knows"), SuggestionKind::Other);
    }
}
