use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::{App, InputMode};
use crate::context::{ContextNode, NodeKind, ancestors_of, flatten_visible};
use crate::model::ClusterOperationPanel;
use crate::session::SessionSlot;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let active = app
        .state()
        .active_panel()
        .and_then(|panel| panel.active_tab())
        .map(|tab| tab.context.cluster_name.clone())
        .unwrap_or_else(|| "no cluster".to_string());
    let line = Line::from(vec![
        Span::styled(
            " MANTA ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {active}"), Style::default().fg(Color::White)),
        Span::styled(
            format!("  {} panel(s)", app.state().panels.len()),
            Style::default().fg(MUTED),
        ),
    ]);
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(20)])
        .split(area);

    render_tree(frame, chunks[0], app);
    render_panels(frame, chunks[1], app);
}

fn render_tree(frame: &mut Frame, area: Rect, app: &App) {
    let roots = app.tree();
    let visible = flatten_visible(roots);
    let selected_id = app
        .state()
        .selected_context
        .as_ref()
        .map(|node| node.id.clone());

    let mut lines = Vec::with_capacity(visible.len());
    for (index, node) in visible.iter().enumerate() {
        lines.push(tree_line(
            roots,
            node,
            index == app.cursor(),
            selected_id.as_deref() == Some(node.id.as_str()),
            app,
        ));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "no kubeconfig contexts",
            Style::default().fg(MUTED),
        )));
    }

    let block = Block::default()
        .title(" Contexts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MUTED))
        .style(Style::default().bg(PANEL));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn tree_line<'a>(
    roots: &[ContextNode],
    node: &'a ContextNode,
    at_cursor: bool,
    selected: bool,
    app: &'a App,
) -> Line<'a> {
    let depth = ancestors_of(roots, &node.id).len();
    let indent = "  ".repeat(depth);
    let marker = match node.kind {
        NodeKind::Folder if node.expanded => "▾ ",
        NodeKind::Folder => "▸ ",
        NodeKind::Context => "● ",
    };

    let mut style = match node.kind {
        NodeKind::Folder => Style::default().fg(MUTED),
        NodeKind::Context => Style::default().fg(Color::White),
    };
    if selected {
        style = style.fg(ACCENT);
    }
    if at_cursor {
        style = style.bg(Color::Rgb(30, 48, 72)).add_modifier(Modifier::BOLD);
    }

    let mut spans = vec![Span::styled(
        format!("{indent}{marker}{}", node.name),
        style,
    )];
    let tags = app.tags_for(&node.id);
    if !tags.is_empty() {
        spans.push(Span::styled(
            format!(" [{}]", tags.join(",")),
            Style::default().fg(WARN),
        ));
    }
    Line::from(spans)
}

fn render_panels(frame: &mut Frame, area: Rect, app: &App) {
    let panels = &app.state().panels;
    if panels.is_empty() {
        return;
    }
    let constraints: Vec<Constraint> = panels
        .iter()
        .map(|_| Constraint::Ratio(1, panels.len() as u32))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (panel, chunk) in panels.iter().zip(chunks.iter()) {
        render_panel(frame, *chunk, app, panel);
    }
}

fn render_panel(frame: &mut Frame, area: Rect, app: &App, panel: &ClusterOperationPanel) {
    let focused = panel.id == app.state().active_panel_id;
    let border = if focused { ACCENT } else { MUTED };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(8),
        ])
        .split(inner);

    render_tab_bar(frame, chunks[0], panel);
    let Some(tab) = panel.active_tab() else {
        frame.render_widget(
            Paragraph::new("select a context from the tree")
                .style(Style::default().fg(MUTED)),
            chunks[1],
        );
        return;
    };
    render_terminal(frame, chunks[1], app, tab.id);
    render_detail(frame, chunks[2], app, tab);
}

fn render_tab_bar(frame: &mut Frame, area: Rect, panel: &ClusterOperationPanel) {
    let mut spans = Vec::new();
    for tab in &panel.tabs {
        let active =
            panel.active_context_id.as_deref() == Some(tab.context.id.as_str());
        let style = if active {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        spans.push(Span::styled(format!(" {} ", tab.context.cluster_name), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_terminal(frame: &mut Frame, area: Rect, app: &App, tab: crate::model::TabId) {
    match app.coordinator().slot(tab) {
        Some(SessionSlot::Ready(session)) => {
            let screen = session.screen.screen();
            let (_, cols) = screen.size();
            let lines: Vec<Line> = screen
                .rows(0, cols)
                .map(|row| Line::from(Span::styled(row, Style::default().fg(Color::White))))
                .collect();
            frame.render_widget(Paragraph::new(lines), area);
        }
        Some(SessionSlot::Connecting) | None => {
            frame.render_widget(
                Paragraph::new("connecting…").style(Style::default().fg(WARN)),
                area,
            );
        }
        Some(SessionSlot::Failed(error)) => {
            frame.render_widget(
                Paragraph::new(format!("session failed: {error}"))
                    .style(Style::default().fg(ERROR))
                    .wrap(Wrap { trim: true }),
                area,
            );
        }
    }
}

fn render_detail(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    tab: &crate::model::ClusterContextTab,
) {
    let view = app.coordinator().view(tab.id).cloned().unwrap_or_default();
    let snapshot = app.snapshot_for(&tab.context.id);

    let mut lines = Vec::new();
    let mut title_spans = vec![Span::styled(
        view.resource_kind.title(),
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    )];
    if let Some(snapshot) = snapshot {
        title_spans.push(Span::styled(
            format!(
                "  nodes {}/{}  pods {}",
                snapshot.stats.ready_nodes, snapshot.stats.nodes, snapshot.stats.pods
            ),
            Style::default().fg(MUTED),
        ));
        if let Some(at) = snapshot.refreshed_at {
            title_spans.push(Span::styled(
                format!("  {}", at.format("%H:%M:%S")),
                Style::default().fg(MUTED),
            ));
        }
    }
    lines.push(Line::from(title_spans));

    match snapshot {
        Some(snapshot) if snapshot.error.is_some() => {
            let error = snapshot.error.clone().unwrap_or_default();
            lines.push(Line::from(Span::styled(
                error,
                Style::default().fg(ERROR),
            )));
        }
        Some(snapshot) => {
            for row in snapshot
                .rows
                .iter()
                .filter(|row| view.filter.is_empty() || row.contains(&view.filter))
            {
                let style = if view.expanded.contains(row) {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                lines.push(Line::from(Span::styled(row.clone(), style)));
            }
        }
        None => {
            lines.push(Line::from(Span::styled(
                "waiting for first refresh…",
                Style::default().fg(MUTED),
            )));
        }
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(MUTED));
    frame.render_widget(
        Paragraph::new(lines).block(block).scroll((view.scroll, 0)),
        area,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = match app.mode() {
        InputMode::Jump => Line::from(vec![
            Span::styled(
                " JUMP ",
                Style::default().fg(Color::Black).bg(WARN),
            ),
            Span::styled(format!(" :{}", app.input()), Style::default().fg(Color::White)),
        ]),
        InputMode::Terminal => Line::from(vec![
            Span::styled(
                " TERM ",
                Style::default().fg(Color::Black).bg(ACCENT),
            ),
            Span::styled(
                " keys go to the shell, Ctrl-t to leave",
                Style::default().fg(MUTED),
            ),
        ]),
        InputMode::Normal => Line::from(Span::styled(
            format!(" {}", app.status()),
            Style::default().fg(MUTED),
        )),
    };
    frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);
}

fn render_help_modal(frame: &mut Frame) {
    let area = centered_rect(52, 16, frame.area());
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(Span::styled(
            "Keys",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from("  j/k       move in the context tree"),
        Line::from("  Enter     open / activate the context"),
        Line::from("  Space     expand / collapse a folder"),
        Line::from("  h/l       previous / next tab"),
        Line::from("  Tab       next panel"),
        Line::from("  x         close tab    s  split right"),
        Line::from("  [ / ]     reorder tab  < / >  move tab"),
        Line::from("  R         reload tab   t  terminal focus"),
        Line::from("  ;         jump to resource (po, no, deploy, svc, ev)"),
        Line::from("  PgUp/PgDn scroll detail view"),
        Line::from("  q         quit"),
    ];
    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
