use crate::types::{DatabaseSchemaSnapshot, Suggestion};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export a snapshot to pretty-printed JSON
pub fn export_snapshot_json(snapshot: &DatabaseSchemaSnapshot, output_path: &Path) -> Result<()> {
    write_json(snapshot, output_path)
}

/// Export suggestions to pretty-printed JSON
pub fn export_suggestions_json(suggestions: &[Suggestion], output_path: &Path) -> Result<()> {
    write_json(&suggestions, output_path)
}

fn write_json<T: serde::Serialize>(value: &T, output_path: &Path) -> Result<()> {
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    let output = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    file.write_all(output.as_bytes())
        .context("Failed to write JSON file")?;
    file.flush().context("Failed to flush file")?;
    Ok(())
}
