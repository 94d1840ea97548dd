pub mod cache;
pub mod layout;

use crate::types::{
    ColumnSchema, DatabaseSchemaSnapshot, EdgeStyle, GraphEdge, GraphNode, NodeData, Position,
    Suggestion, TableSchema,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub use cache::LayoutCache;
pub use layout::{compute_layout, Layout};

/// One diagram node per table, flagged with issue markers.
///
/// `has_ai_issues` means some suggestion targets the table;
/// `has_schema_issues` means some column either needs an index (resolved
/// FK without one) or has gone unused for over a year. Positions start
/// at the origin and are filled in by the layout pass.
pub fn build_nodes(
    tables: &[TableSchema],
    columns: &[ColumnSchema],
    suggestions: &[Suggestion],
    selected: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<GraphNode> {
    let flagged_tables: HashSet<&str> = suggestions.iter().map(|s| s.table_id.as_str()).collect();

    tables
        .iter()
        .map(|table| {
            let table_columns: Vec<ColumnSchema> = columns
                .iter()
                .filter(|c| c.table_name == table.table_name)
                .cloned()
                .collect();
            let has_schema_issues = table_columns
                .iter()
                .any(|c| c.needs_index() || c.is_stale(now));
            GraphNode {
                id: table.table_name.clone(),
                node_type: "tableNode".to_string(),
                position: Position::default(),
                data: NodeData {
                    table_name: table.table_name.clone(),
                    selected: selected == Some(table.table_name.as_str()),
                    has_ai_issues: flagged_tables.contains(table.table_name.as_str()),
                    has_schema_issues,
                    columns: table_columns,
                },
            }
        })
        .collect()
}

/// One edge per column with a resolved foreign key.
///
/// Edge ids are deterministic (`{source}-{column}-{target}`); edges whose
/// target table is missing from the current set are dropped with a
/// warning, since snapshots can be partial or stale relative to the live
/// database. Unindexed FK columns get the dashed/animated treatment.
pub fn build_edges(columns: &[ColumnSchema], table_ids: &[String]) -> Vec<GraphEdge> {
    let known: HashSet<&str> = table_ids.iter().map(String::as_str).collect();

    let mut edges = Vec::new();
    for column in columns {
        let Some(target_ref) = column.foreign_key_to.as_deref() else {
            continue;
        };
        let (target_table, target_column) = match target_ref.split_once('.') {
            Some(parts) => parts,
            None => (target_ref, "id"),
        };
        if !known.contains(target_table) {
            warn!(
                source = %column.table_name,
                column = %column.column_name,
                target = %target_table,
                "edge target not in current table set, dropping edge"
            );
            continue;
        }
        let dashed = column.needs_index();
        edges.push(GraphEdge {
            id: format!(
                "{}-{}-{}",
                column.table_name, column.column_name, target_table
            ),
            source: column.table_name.clone(),
            target: target_table.to_string(),
            source_column: column.column_name.clone(),
            target_column: target_column.to_string(),
            source_handle: None,
            target_handle: None,
            animated: dashed,
            style: EdgeStyle { dashed },
        });
    }
    edges
}

/// Pick connection handles from the nodes' relative positions: the
/// dominant axis decides horizontal vs vertical routing, the sign of the
/// delta picks the near side.
pub fn edge_handles(source: Position, target: Position) -> (&'static str, &'static str) {
    let dx = target.x - source.x;
    let dy = target.y - source.y;
    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            ("right", "left-target")
        } else {
            ("left", "right-target")
        }
    } else if dy > 0.0 {
        ("bottom", "top-target")
    } else {
        ("top", "bottom-target")
    }
}

/// Stamp node positions from a layout and route every edge's handles
/// accordingly. Edges between nodes the layout does not know keep their
/// handles unset.
pub fn apply_layout(nodes: &mut [GraphNode], edges: &mut [GraphEdge], layout: &Layout) {
    for node in nodes.iter_mut() {
        if let Some(position) = layout.positions.get(&node.id) {
            node.position = *position;
        }
    }
    for edge in edges.iter_mut() {
        let (Some(source), Some(target)) = (
            layout.positions.get(&edge.source),
            layout.positions.get(&edge.target),
        ) else {
            continue;
        };
        let (source_handle, target_handle) = edge_handles(*source, *target);
        edge.source_handle = Some(source_handle.to_string());
        edge.target_handle = Some(target_handle.to_string());
    }
}

/// Derive the full diagram for a snapshot, memoized through the layout
/// cache. The key is coarse on purpose (table count, suggestion count,
/// manual relayout version): close enough for redraw traffic, and a
/// relayout bump forces a fresh key.
pub fn build_diagram(
    snapshot: &DatabaseSchemaSnapshot,
    suggestions: &[Suggestion],
    cache: &mut LayoutCache,
    relayout_version: u64,
) -> (Vec<GraphNode>, Vec<GraphEdge>, Layout) {
    let key = cache::layout_key(snapshot.tables.len(), suggestions.len(), relayout_version);

    let cached_nodes = cache.get_nodes(&key).cloned();
    let cached_edges = cache.get_edges(&key).cloned();
    let cached_layout = cache.get_layout(&key).cloned();
    if let (Some(nodes), Some(edges), Some(layout)) = (cached_nodes, cached_edges, cached_layout) {
        debug!(key = %key, "diagram served from layout cache");
        return (nodes, edges, layout);
    }

    let table_ids: Vec<String> = snapshot
        .tables
        .iter()
        .map(|t| t.table_name.clone())
        .collect();
    let mut nodes = build_nodes(
        &snapshot.tables,
        &snapshot.columns,
        suggestions,
        None,
        Utc::now(),
    );
    let mut edges = build_edges(&snapshot.columns, &table_ids);
    let layout = compute_layout(&table_ids);
    apply_layout(&mut nodes, &mut edges, &layout);

    let lookup: HashMap<String, String> = table_ids
        .iter()
        .map(|id| (id.to_lowercase(), id.clone()))
        .collect();

    cache.set_nodes(&key, nodes.clone());
    cache.set_edges(&key, edges.clone());
    cache.set_layout(&key, layout.clone());
    cache.set_table_lookup(&key, lookup);

    (nodes, edges, layout)
}
