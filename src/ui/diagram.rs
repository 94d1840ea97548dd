use crate::types::{GraphEdge, GraphNode};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::collections::HashMap;

/// Terminal-cell rectangle for one node after scaling
#[derive(Debug, Clone, Copy)]
pub struct NodeRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl NodeRect {
    fn center(&self) -> (u16, u16) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Scale layout coordinates onto the drawing area. Box dimensions are
/// clamped so labels stay readable regardless of graph density.
pub fn place_nodes(
    nodes: &[GraphNode],
    extent_width: f64,
    extent_height: f64,
    area: Rect,
) -> HashMap<String, NodeRect> {
    let box_width = (area.width / 4).clamp(20, 36);
    let box_height = (area.height / 4).clamp(6, 12);

    let scale_x = if extent_width > 0.0 {
        area.width.saturating_sub(box_width) as f64 / extent_width
    } else {
        0.0
    };
    let scale_y = if extent_height > 0.0 {
        area.height.saturating_sub(box_height) as f64 / extent_height
    } else {
        0.0
    };

    nodes
        .iter()
        .map(|node| {
            let x = area.x + (node.position.x * scale_x) as u16;
            let y = area.y + (node.position.y * scale_y) as u16;
            let width = box_width.min(area.width.saturating_sub(x - area.x)).max(1);
            let height = box_height.min(area.height.saturating_sub(y - area.y)).max(1);
            (
                node.id.clone(),
                NodeRect {
                    x,
                    y,
                    width,
                    height,
                },
            )
        })
        .collect()
}

/// Render the full diagram: edges first, node boxes on top.
pub fn render_diagram(frame: &mut Frame, area: Rect, nodes: &[GraphNode], edges: &[GraphEdge]) {
    if nodes.is_empty() {
        let empty = Paragraph::new("No tables in the latest snapshot")
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let mut max_x = 0.0f64;
    let mut max_y = 0.0f64;
    for node in nodes {
        max_x = max_x.max(node.position.x);
        max_y = max_y.max(node.position.y);
    }
    let rects = place_nodes(nodes, max_x, max_y, area);

    let obstacles: Vec<NodeRect> = rects.values().copied().collect();
    for edge in edges {
        draw_edge(frame.buffer_mut(), area, edge, &rects, &obstacles);
    }

    for node in nodes {
        if let Some(rect) = rects.get(&node.id) {
            render_node_box(frame, node, *rect);
        }
    }
}

fn render_node_box(frame: &mut Frame, node: &GraphNode, rect: NodeRect) {
    if rect.width < 3 || rect.height < 3 {
        return;
    }
    let area = Rect::new(rect.x, rect.y, rect.width, rect.height);

    let mut title = node.data.table_name.clone();
    if node.data.has_ai_issues {
        title.push_str(" !");
    }
    if node.data.has_schema_issues {
        title.push_str(" ~");
    }
    let border_color = if node.data.has_ai_issues {
        Color::Red
    } else if node.data.has_schema_issues {
        Color::Yellow
    } else {
        Color::White
    };

    let block = Block::default()
        .title(title)
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    let max_rows = (inner.height as usize).min(node.data.columns.len());
    for column in node.data.columns.iter().take(max_rows) {
        let mut spans = Vec::new();
        if column.is_primary_key {
            spans.push(Span::styled(
                "*",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(" "));
        }

        let name = if column.column_name.len() > 14 {
            format!("{}…", &column.column_name[..13])
        } else {
            column.column_name.clone()
        };
        spans.push(Span::styled(name, Style::default().fg(Color::White)));

        if column.foreign_key_to.is_some() {
            let fk_color = if column.indexed {
                Color::Green
            } else {
                Color::LightRed
            };
            spans.push(Span::styled(" FK", Style::default().fg(fk_color)));
        }
        lines.push(Line::from(spans));
    }
    if node.data.columns.len() > max_rows {
        lines.push(Line::from(Span::styled(
            format!("… {} more", node.data.columns.len() - max_rows),
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

/// Edge anchor on a box side, derived from the handle the generator
/// picked for this edge.
fn anchor(rect: &NodeRect, handle: Option<&str>) -> (u16, u16) {
    let (cx, cy) = rect.center();
    match handle.map(|h| h.trim_end_matches("-target")) {
        Some("left") => (rect.x, cy),
        Some("right") => (rect.x + rect.width.saturating_sub(1), cy),
        Some("top") => (cx, rect.y),
        Some("bottom") => (cx, rect.y + rect.height.saturating_sub(1)),
        _ => (cx, cy),
    }
}

fn draw_edge(
    buf: &mut Buffer,
    area: Rect,
    edge: &GraphEdge,
    rects: &HashMap<String, NodeRect>,
    obstacles: &[NodeRect],
) {
    let (Some(source), Some(target)) = (rects.get(&edge.source), rects.get(&edge.target)) else {
        return;
    };
    if edge.source == edge.target {
        return;
    }

    let (x1, y1) = anchor(source, edge.source_handle.as_deref());
    let (x2, y2) = anchor(target, edge.target_handle.as_deref());

    let style = if edge.style.dashed {
        Style::default().fg(Color::LightRed)
    } else {
        Style::default().fg(Color::LightGreen)
    };

    let points = line_points(x1, y1, x2, y2);
    let last = points.len().saturating_sub(1);
    for (i, &(x, y)) in points.iter().enumerate() {
        if x < area.x || x >= area.x + area.width || y < area.y || y >= area.y + area.height {
            continue;
        }
        // Never draw through a table box; endpoints sit on box borders.
        if i != 0 && i != last && obstacles.iter().any(|r| r.contains(x, y)) {
            continue;
        }
        // Dashed edges skip every other cell.
        if edge.style.dashed && i % 2 == 1 && i != last {
            continue;
        }
        let ch = if i == last {
            arrow_head(points.get(last.wrapping_sub(1)).copied(), (x, y))
        } else if i > 0 {
            segment_char(points[i - 1], (x, y))
        } else {
            '─'
        };
        let cell = buf.get_mut(x, y);
        if cell.symbol() == " " || "─│/\\><^v".contains(cell.symbol()) {
            cell.set_char(ch);
            cell.set_style(style);
        }
    }
}

/// Integer line rasterization between two cells, endpoints included.
fn line_points(x1: u16, y1: u16, x2: u16, y2: u16) -> Vec<(u16, u16)> {
    let dx = x2 as i32 - x1 as i32;
    let dy = y2 as i32 - y1 as i32;
    let steps = dx.abs().max(dy.abs()).max(1);
    let mut points = Vec::with_capacity(steps as usize + 1);
    let mut last = None;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = (x1 as f64 + dx as f64 * t).round() as u16;
        let y = (y1 as f64 + dy as f64 * t).round() as u16;
        if last != Some((x, y)) {
            points.push((x, y));
            last = Some((x, y));
        }
    }
    points
}

fn segment_char(prev: (u16, u16), current: (u16, u16)) -> char {
    let dx = current.0 as i32 - prev.0 as i32;
    let dy = current.1 as i32 - prev.1 as i32;
    if dx != 0 && dy != 0 {
        if (dx > 0) == (dy > 0) {
            '\\'
        } else {
            '/'
        }
    } else if dx != 0 {
        '─'
    } else {
        '│'
    }
}

fn arrow_head(prev: Option<(u16, u16)>, current: (u16, u16)) -> char {
    let Some(prev) = prev else {
        return '>';
    };
    let dx = current.0 as i32 - prev.0 as i32;
    let dy = current.1 as i32 - prev.1 as i32;
    if dx.abs() >= dy.abs() {
        if dx >= 0 {
            '>'
        } else {
            '<'
        }
    } else if dy > 0 {
        'v'
    } else {
        '^'
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeData, Position};

    fn node(id: &str, x: f64, y: f64) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            node_type: "tableNode".to_string(),
            position: Position { x, y },
            data: NodeData {
                table_name: id.to_string(),
                columns: Vec::new(),
                selected: false,
                has_ai_issues: false,
                has_schema_issues: false,
            },
        }
    }

    #[test]
    fn placement_keeps_nodes_inside_the_area() {
        let nodes = vec![
            node("a", 0.0, 0.0),
            node("b", 360.0, 0.0),
            node("c", 0.0, 220.0),
        ];
        let area = Rect::new(0, 0, 120, 40);
        let rects = place_nodes(&nodes, 360.0, 220.0, area);
        for rect in rects.values() {
            assert!(rect.x + rect.width <= 120);
            assert!(rect.y + rect.height <= 40);
        }
        assert!(rects["b"].x > rects["a"].x);
        assert!(rects["c"].y > rects["a"].y);
    }

    #[test]
    fn line_points_cover_both_endpoints() {
        let points = line_points(0, 0, 5, 3);
        assert_eq!(points.first(), Some(&(0, 0)));
        assert_eq!(points.last(), Some(&(5, 3)));
        for pair in points.windows(2) {
            let dx = (pair[1].0 as i32 - pair[0].0 as i32).abs();
            let dy = (pair[1].1 as i32 - pair[0].1 as i32).abs();
            assert!(dx <= 1 && dy <= 1);
        }
    }

    #[test]
    fn anchors_follow_handles() {
        let rect = NodeRect {
            x: 10,
            y: 10,
            width: 10,
            height: 4,
        };
        assert_eq!(anchor(&rect, Some("left")), (10, 12));
        assert_eq!(anchor(&rect, Some("right-target")), (19, 12));
        assert_eq!(anchor(&rect, Some("top")), (15, 10));
        assert_eq!(anchor(&rect, Some("bottom")), (15, 13));
        assert_eq!(anchor(&rect, None), rect.center());
    }
}
