use crate::types::IndexSchema;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio_postgres::NoTls;
use tracing::debug;

/// Constraint and index metadata read straight from the catalog. Anything
/// in here overrides the name-based heuristics.
#[derive(Debug, Default)]
pub struct CatalogMetadata {
    /// (table, column) pairs under a PRIMARY KEY constraint
    pub primary_keys: Vec<(String, String)>,
    /// (table, column) -> "referenced_table.referenced_column"
    pub foreign_keys: HashMap<(String, String), String>,
    pub indexes: Vec<IndexSchema>,
    /// table -> planner row estimate
    pub row_estimates: HashMap<String, u64>,
}

const PRIMARY_KEY_QUERY: &str = "\
    SELECT ku.table_name, ku.column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage ku
      ON tc.constraint_name = ku.constraint_name
     AND tc.table_schema = ku.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = 'public'";

const FOREIGN_KEY_QUERY: &str = "\
    SELECT tc.table_name, kcu.column_name, ccu.table_name, ccu.column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name
    WHERE tc.constraint_type = 'FOREIGN KEY'
      AND tc.table_schema = 'public'";

const INDEX_QUERY: &str = "\
    SELECT schemaname, tablename, indexname, indexdef
    FROM pg_catalog.pg_indexes
    WHERE schemaname = 'public'";

const ROW_ESTIMATE_QUERY: &str = "\
    SELECT relname, reltuples::bigint
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = 'public' AND c.relkind = 'r'";

/// Read authoritative schema metadata over a direct connection.
///
/// The caller treats any error here as "privilege not available" and
/// falls back to the OpenAPI-only path.
pub async fn introspect(database_url: &str) -> Result<CatalogMetadata> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls)
        .await
        .context("failed to connect to database")?;
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("postgres driver task exited: {e}");
        }
    });

    let mut metadata = CatalogMetadata::default();

    for row in client
        .query(PRIMARY_KEY_QUERY, &[])
        .await
        .context("primary key query failed")?
    {
        metadata.primary_keys.push((row.get(0), row.get(1)));
    }

    for row in client
        .query(FOREIGN_KEY_QUERY, &[])
        .await
        .context("foreign key query failed")?
    {
        let table: String = row.get(0);
        let column: String = row.get(1);
        let ref_table: String = row.get(2);
        let ref_column: String = row.get(3);
        metadata
            .foreign_keys
            .insert((table, column), format!("{ref_table}.{ref_column}"));
    }

    for row in client
        .query(INDEX_QUERY, &[])
        .await
        .context("index query failed")?
    {
        let index_name: String = row.get(2);
        let indexdef: String = row.get(3);
        metadata.indexes.push(IndexSchema {
            schema: row.get(0),
            table_name: row.get(1),
            is_unique: indexdef.contains("UNIQUE"),
            is_primary: index_name.ends_with("_pkey"),
            columns: parse_index_columns(&indexdef),
            index_name,
        });
    }

    for row in client
        .query(ROW_ESTIMATE_QUERY, &[])
        .await
        .context("row estimate query failed")?
    {
        let table: String = row.get(0);
        let estimate: i64 = row.get(1);
        if estimate >= 0 {
            metadata.row_estimates.insert(table, estimate as u64);
        }
    }

    driver.abort();
    Ok(metadata)
}

/// Pull the column list out of an index definition like
/// `CREATE UNIQUE INDEX users_pkey ON public.users USING btree (id)`.
fn parse_index_columns(indexdef: &str) -> Vec<String> {
    let Some(open) = indexdef.find('(') else {
        return Vec::new();
    };
    let Some(close) = indexdef.rfind(')') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }
    indexdef[open + 1..close]
        .split(',')
        .map(|col| col.trim().trim_matches('"').to_string())
        .filter(|col| !col.is_empty())
        .collect()
}
