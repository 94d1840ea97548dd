mod auth;
mod catalog;
mod openapi;
mod resolve;

use crate::types::{ColumnSchema, DatabaseSchemaSnapshot, IndexSchema, TableSchema};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

pub use auth::{key_role, KeyRole};
pub use catalog::CatalogMetadata;
pub use openapi::{list_tables, map_columns, map_type, parse_fk_hint};
pub use resolve::{pluralization_variants, resolve_foreign_keys};

#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("response from {url} is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Client for a PostgREST-compatible REST root endpoint
pub struct PostgrestClient {
    root_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PostgrestClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            root_url: format!("{}/rest/v1/", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn role(&self) -> KeyRole {
        auth::key_role(&self.api_key)
    }

    /// Fetch the OpenAPI root document that PostgREST serves at the
    /// REST root. `paths` lists tables, `definitions` lists columns.
    pub async fn fetch_root(&self) -> Result<Value, IntrospectError> {
        let response = self
            .client
            .get(&self.root_url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|source| IntrospectError::Request {
                url: self.root_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntrospectError::Status {
                url: self.root_url.clone(),
                status,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| IntrospectError::Parse {
                url: self.root_url.clone(),
                source,
            })
    }
}

/// Builds snapshots from a PostgREST endpoint, optionally enriched by a
/// direct catalog connection.
pub struct Introspector {
    client: PostgrestClient,
    database_url: Option<String>,
}

impl Introspector {
    pub fn new(client: PostgrestClient, database_url: Option<String>) -> Self {
        Self {
            client,
            database_url,
        }
    }

    /// Assemble a full snapshot.
    ///
    /// Introspection failures degrade to an empty snapshot: a partial or
    /// empty diagram beats a hard failure here. Catalog access is only
    /// attempted for privileged keys and its failure only costs accuracy.
    pub async fn snapshot(&self) -> DatabaseSchemaSnapshot {
        let catalog_metadata = async {
            let url = self.database_url.as_deref()?;
            if !self.client.role().is_privileged() {
                debug!("api key is not service_role, skipping catalog introspection");
                return None;
            }
            match catalog::introspect(url).await {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    warn!("catalog introspection unavailable, using OpenAPI only: {e:#}");
                    None
                }
            }
        };

        let (doc, metadata) = tokio::join!(self.client.fetch_root(), catalog_metadata);

        let doc = match doc {
            Ok(doc) => doc,
            Err(e) => {
                warn!("schema introspection failed, treating as empty: {e}");
                return DatabaseSchemaSnapshot::default();
            }
        };

        let table_names = openapi::list_tables(&doc);
        let mut columns = openapi::map_columns(&doc, &table_names);
        let mut tables: Vec<TableSchema> = table_names
            .iter()
            .map(|name| TableSchema::new("public", name.clone()))
            .collect();
        let mut indexes = Vec::new();

        if let Some(metadata) = metadata {
            apply_catalog_metadata(&mut tables, &mut columns, &mut indexes, metadata);
        }

        resolve::resolve_foreign_keys(&mut columns, &table_names);
        mark_indexed_columns(&mut columns, &indexes);

        DatabaseSchemaSnapshot {
            tables,
            columns,
            indexes,
        }
    }
}

/// Overlay authoritative catalog metadata on the heuristic view.
fn apply_catalog_metadata(
    tables: &mut [TableSchema],
    columns: &mut [ColumnSchema],
    indexes: &mut Vec<IndexSchema>,
    metadata: CatalogMetadata,
) {
    let pk_set: HashSet<(&str, &str)> = metadata
        .primary_keys
        .iter()
        .map(|(t, c)| (t.as_str(), c.as_str()))
        .collect();
    let tables_with_pk_info: HashSet<&str> =
        metadata.primary_keys.iter().map(|(t, _)| t.as_str()).collect();

    for column in columns.iter_mut() {
        // Real constraints replace the name-based guess, but only for
        // tables the catalog actually reported on.
        if tables_with_pk_info.contains(column.table_name.as_str()) {
            column.is_primary_key =
                pk_set.contains(&(column.table_name.as_str(), column.column_name.as_str()));
        }
        if let Some(target) = metadata
            .foreign_keys
            .get(&(column.table_name.clone(), column.column_name.clone()))
        {
            column.foreign_key_to = Some(target.clone());
        }
    }

    for table in tables.iter_mut() {
        if let Some(estimate) = metadata.row_estimates.get(&table.table_name) {
            table.row_estimate = Some(*estimate);
        }
    }

    indexes.extend(metadata.indexes);
}

/// Flag every column that some index covers. Index column entries may
/// carry qualifiers ("created_at DESC"), so compare on the first token.
fn mark_indexed_columns(columns: &mut [ColumnSchema], indexes: &[IndexSchema]) {
    let mut covered: HashMap<&str, HashSet<&str>> = HashMap::new();
    for index in indexes {
        let entry = covered.entry(index.table_name.as_str()).or_default();
        for column in &index.columns {
            entry.insert(column.split_whitespace().next().unwrap_or(column));
        }
    }
    for column in columns.iter_mut() {
        if let Some(cols) = covered.get(column.table_name.as_str()) {
            if cols.contains(column.column_name.as_str()) {
                column.indexed = true;
            }
        }
    }
}
