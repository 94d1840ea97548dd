use crate::types::ColumnSchema;
use serde::{Deserialize, Serialize};

/// 2D position assigned to a node by the layout pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Payload carried by a diagram node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
    pub selected: bool,
    pub has_ai_issues: bool,
    pub has_schema_issues: bool,
}

/// A diagram node in the shape the rendering library consumes.
/// One node per table id; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data: NodeData,
}

/// Visual styling for an edge
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub dashed: bool,
}

/// A diagram edge for one resolved foreign key column.
///
/// Id is deterministic: `{sourceTable}-{column}-{targetTable}`. Handle
/// ids are the four sides (`left`/`right`/`top`/`bottom`) with
/// `-target` suffixed counterparts on the receiving node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_column: String,
    pub target_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    pub animated: bool,
    pub style: EdgeStyle,
}
