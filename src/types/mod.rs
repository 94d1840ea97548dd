pub mod graph;
pub mod schema;
pub mod suggestion;

pub use graph::{EdgeStyle, GraphEdge, GraphNode, NodeData, Position};
pub use schema::{ColumnSchema, ColumnUsage, DatabaseSchemaSnapshot, IndexSchema, TableSchema};
pub use suggestion::{Severity, Suggestion, SuggestionKind, SuggestionStatus};
