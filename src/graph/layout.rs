use crate::types::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NODE_WIDTH: f64 = 240.0;
pub const NODE_HEIGHT: f64 = 140.0;
pub const GUTTER_X: f64 = 120.0;
pub const GUTTER_Y: f64 = 80.0;

/// Result of a layout pass: a position per node id plus the extents of
/// the whole graph. Pure function of the node id list, so identical
/// inputs always land on identical positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub positions: BTreeMap<String, Position>,
    pub width: f64,
    pub height: f64,
}

/// Place nodes on a near-square grid: ceil(sqrt(n)) columns, fixed cell
/// dimensions, input order preserved row by row.
pub fn compute_layout(node_ids: &[String]) -> Layout {
    if node_ids.is_empty() {
        return Layout::default();
    }

    let count = node_ids.len();
    let cols = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);

    let cell_width = NODE_WIDTH + GUTTER_X;
    let cell_height = NODE_HEIGHT + GUTTER_Y;

    let mut positions = BTreeMap::new();
    for (i, id) in node_ids.iter().enumerate() {
        let col = i % cols;
        let row = i / cols;
        positions.insert(
            id.clone(),
            Position {
                x: col as f64 * cell_width,
                y: row as f64 * cell_height,
            },
        );
    }

    Layout {
        positions,
        width: cols as f64 * cell_width - GUTTER_X,
        height: rows as f64 * cell_height - GUTTER_Y,
    }
}
