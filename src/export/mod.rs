mod csv;
mod json;

use crate::store::Store;
use anyhow::{bail, Result};
use std::path::Path;

pub use self::csv::{export_snapshot_csv, export_suggestions_csv};
pub use self::json::{export_snapshot_json, export_suggestions_json};

/// Export format
#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// What to export
#[derive(Debug, Clone, Copy)]
pub enum ExportTarget {
    Snapshot,
    Suggestions,
}

/// Export the latest snapshot or the suggestion list for a project.
pub fn export(
    store: &Store,
    project: &str,
    target: ExportTarget,
    format: ExportFormat,
    output_path: &Path,
) -> Result<()> {
    match target {
        ExportTarget::Snapshot => {
            let Some(row) = store.latest_snapshot(project)? else {
                bail!("no snapshot for project '{project}'; run sync first");
            };
            match format {
                ExportFormat::Csv => export_snapshot_csv(&row.snapshot, output_path),
                ExportFormat::Json => export_snapshot_json(&row.snapshot, output_path),
            }
        }
        ExportTarget::Suggestions => {
            let suggestions = store.list_suggestions(project, None)?;
            match format {
                ExportFormat::Csv => export_suggestions_csv(&suggestions, output_path),
                ExportFormat::Json => export_suggestions_json(&suggestions, output_path),
            }
        }
    }
}
