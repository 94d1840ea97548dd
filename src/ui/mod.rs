mod diagram;

use crate::graph::{self, LayoutCache};
use crate::store::Store;
use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use std::io;

pub use diagram::render_diagram;

struct Viewer {
    nodes: Vec<crate::types::GraphNode>,
    edges: Vec<crate::types::GraphEdge>,
    relayout_version: u64,
}

/// Interactive ER-diagram viewer over the latest snapshot.
///
/// `r` bumps the manual relayout version (recomputing through a fresh
/// cache key), `q` or Esc quits.
pub fn run_viewer(store: &Store, project: &str) -> Result<()> {
    let Some(row) = store.latest_snapshot(project)? else {
        bail!("no snapshot for project '{project}'; run sync first");
    };
    let mut snapshot = row.snapshot;
    snapshot.apply_usage(&store.list_usage(project)?);
    let suggestions = store.list_suggestions(project, None)?;

    let mut cache = LayoutCache::new();
    let mut viewer = Viewer {
        nodes: Vec::new(),
        edges: Vec::new(),
        relayout_version: 0,
    };
    let (nodes, edges, _) =
        graph::build_diagram(&snapshot, &suggestions, &mut cache, viewer.relayout_version);
    viewer.nodes = nodes;
    viewer.edges = edges;

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let result = event_loop(&mut terminal, &mut viewer, |version| {
        let (nodes, edges, _) = graph::build_diagram(&snapshot, &suggestions, &mut cache, version);
        (nodes, edges)
    });

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B, F>(
    terminal: &mut Terminal<B>,
    viewer: &mut Viewer,
    mut rebuild: F,
) -> Result<()>
where
    B: ratatui::backend::Backend,
    F: FnMut(u64) -> (Vec<crate::types::GraphNode>, Vec<crate::types::GraphEdge>),
{
    loop {
        terminal.draw(|frame| render(frame, viewer))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('r') => {
                        viewer.relayout_version += 1;
                        let (nodes, edges) = rebuild(viewer.relayout_version);
                        viewer.nodes = nodes;
                        viewer.edges = edges;
                    }
                    _ => {}
                },
                Event::Resize(_, _) => {
                    // redrawn on the next draw() call
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn render(frame: &mut Frame, viewer: &Viewer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.size());

    render_diagram(frame, chunks[0], &viewer.nodes, &viewer.edges);

    let status = Line::from(vec![
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" relayout  "),
        Span::styled(
            format!(
                "{} tables, {} edges",
                viewer.nodes.len(),
                viewer.edges.len()
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(status), chunks[1]);
}
