use crate::store::{Store, StoreError};
use crate::types::{ColumnUsage, DatabaseSchemaSnapshot, Suggestion, SuggestionStatus};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("advice was generated {minutes_ago} minutes ago; wait {cooldown_hours}h between runs")]
    CooldownActive {
        minutes_ago: i64,
        cooldown_hours: i64,
    },
    #[error("no snapshot for project '{0}'; run sync first")]
    NoSnapshot(String),
    #[error("advice request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model reply carried no parsable suggestion list: {0}")]
    BadReply(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An opaque producer of optimization suggestions. The real one talks
/// to an LLM over HTTP; tests plug in canned output.
pub trait AdviceGenerator {
    fn generate(
        &self,
        snapshot: &DatabaseSchemaSnapshot,
        usage: &[ColumnUsage],
    ) -> impl std::future::Future<Output = Result<Vec<Suggestion>, AdviceError>> + Send;
}

/// End-to-end advice run for a project: enforce the cooldown, read the
/// latest snapshot, merge usage context, call the generator, and persist
/// whatever is new. No retries; the user re-triggers manually.
pub async fn run_advice<G: AdviceGenerator>(
    store: &mut Store,
    generator: &G,
    project: &str,
    cooldown_hours: i64,
) -> Result<usize, AdviceError> {
    let now = Utc::now();
    if let Some(last) = store.last_advice_run(project)? {
        let elapsed = now - last;
        if elapsed < Duration::hours(cooldown_hours) {
            return Err(AdviceError::CooldownActive {
                minutes_ago: elapsed.num_minutes(),
                cooldown_hours,
            });
        }
    }

    let row = store
        .latest_snapshot(project)?
        .ok_or_else(|| AdviceError::NoSnapshot(project.to_string()))?;
    let usage = store.list_usage(project)?;

    let mut snapshot = row.snapshot;
    snapshot.apply_usage(&usage);

    let mut suggestions = generator.generate(&snapshot, &usage).await?;
    for suggestion in suggestions.iter_mut() {
        if suggestion.table_id.is_empty() {
            suggestion.table_id = suggestion.table_name.clone();
        }
        suggestion.status = SuggestionStatus::Pending;
    }

    let inserted = store.insert_suggestions(project, &suggestions)?;
    store.record_advice_run(project, now)?;
    info!(
        project,
        generated = suggestions.len(),
        inserted,
        "advice run complete"
    );
    Ok(inserted)
}

/// Generator backed by an OpenAI-compatible chat completions endpoint
pub struct OpenAiGenerator {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }
}

impl AdviceGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        snapshot: &DatabaseSchemaSnapshot,
        usage: &[ColumnUsage],
    ) -> Result<Vec<Suggestion>, AdviceError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You review Postgres schemas for missing indexes, unused \
                                columns, and RLS gaps. Reply with a JSON array of \
                                suggestion objects only."
                },
                {
                    "role": "user",
                    "content": summarize_schema(snapshot, usage).to_string()
                }
            ]
        });

        debug!(url = %url, model = %self.model, "requesting advice");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let reply: Value = response.json().await?;
        let content = reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| AdviceError::BadReply("reply had no message content".to_string()))?;
        parse_suggestions(content)
    }
}

/// Compact schema description sent to the model: table and column facts
/// only, no rows, no secrets.
pub fn summarize_schema(snapshot: &DatabaseSchemaSnapshot, usage: &[ColumnUsage]) -> Value {
    let tables: Vec<Value> = snapshot
        .tables
        .iter()
        .map(|table| {
            let columns: Vec<Value> = snapshot
                .columns_for(&table.table_name)
                .into_iter()
                .map(|c| {
                    json!({
                        "name": c.column_name,
                        "type": c.data_type,
                        "nullable": c.is_nullable,
                        "primary_key": c.is_primary_key,
                        "foreign_key_to": c.foreign_key_to,
                        "indexed": c.indexed,
                        "last_used_at": c.last_used_at,
                    })
                })
                .collect();
            json!({
                "table": table.table_name,
                "row_estimate": table.row_estimate,
                "columns": columns,
                "indexes": snapshot
                    .indexes_for(&table.table_name)
                    .into_iter()
                    .map(|i| json!({"name": i.index_name, "columns": i.columns}))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "tables": tables,
        "code_usage_rows": usage.len(),
    })
}

/// Pull a suggestion array out of the model's reply. Models wrap JSON in
/// prose or code fences often enough that we cut from the first `[` to
/// the last `]` before parsing.
pub fn parse_suggestions(content: &str) -> Result<Vec<Suggestion>, AdviceError> {
    let start = content
        .find('[')
        .ok_or_else(|| AdviceError::BadReply("no JSON array in reply".to_string()))?;
    let end = content
        .rfind(']')
        .filter(|end| *end > start)
        .ok_or_else(|| AdviceError::BadReply("unterminated JSON array in reply".to_string()))?;
    serde_json::from_str(&content[start..=end])
        .map_err(|e| AdviceError::BadReply(format!("invalid suggestion JSON: {e}")))
}
