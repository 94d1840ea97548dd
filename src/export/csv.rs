use crate::types::{DatabaseSchemaSnapshot, Suggestion};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;

/// Export a snapshot's columns to CSV, one row per column.
pub fn export_snapshot_csv(snapshot: &DatabaseSchemaSnapshot, output_path: &Path) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    let mut writer = csv::Writer::from_writer(&mut file);

    writer
        .write_record([
            "schema",
            "table",
            "column",
            "type",
            "nullable",
            "default",
            "primary_key",
            "foreign_key_to",
            "indexed",
        ])
        .context("Failed to write CSV header")?;

    for column in &snapshot.columns {
        writer
            .write_record([
                column.schema.as_str(),
                column.table_name.as_str(),
                column.column_name.as_str(),
                column.data_type.as_str(),
                if column.is_nullable { "true" } else { "false" },
                column.column_default.as_deref().unwrap_or(""),
                if column.is_primary_key { "true" } else { "false" },
                column.foreign_key_to.as_deref().unwrap_or(""),
                if column.indexed { "true" } else { "false" },
            ])
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Export suggestions to CSV, one row per suggestion.
pub fn export_suggestions_csv(suggestions: &[Suggestion], output_path: &Path) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    let mut writer = csv::Writer::from_writer(&mut file);

    writer
        .write_record([
            "id",
            "table",
            "column",
            "severity",
            "kind",
            "status",
            "title",
            "description",
            "impact",
        ])
        .context("Failed to write CSV header")?;

    for suggestion in suggestions {
        writer
            .write_record([
                suggestion.id.to_string().as_str(),
                suggestion.table_name.as_str(),
                suggestion.column_name.as_deref().unwrap_or(""),
                suggestion.severity.as_str(),
                suggestion.kind.as_str(),
                suggestion.status.as_str(),
                suggestion.title.as_str(),
                suggestion.description.as_str(),
                suggestion.impact.as_deref().unwrap_or(""),
            ])
            .context("Failed to write CSV row")?;
    }

    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}
