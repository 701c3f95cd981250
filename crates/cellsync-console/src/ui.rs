use crate::app::{App, Focus};
use crate::theme::{self, icons};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let area = f.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(f, app, rows[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(8)])
        .split(body[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(body[1]);

    render_cells(f, app, left[0]);
    render_controls(f, app, left[1]);
    render_logs(f, app, right[0]);
    render_transcript(f, app, right[1]);
    render_input(f, app, rows[2]);

    if app.show_help() {
        render_help(f, centered_rect(50, 60, area));
    }
}

fn panel(title: &str, focused: bool) -> Block<'_> {
    let block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block.border_style(theme::FOCUS_BORDER)
    } else {
        block
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let view = app.view();
    let status = view.status();
    let synced = app
        .last_sync()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut spans = vec![
        Span::styled("CellSync", theme::HEADER_STYLE),
        Span::raw("  "),
        Span::styled(app.backend_url(), theme::DIM_STYLE),
        Span::raw(format!(
            "  cells {}/{}  synced {synced}",
            status.alive_count(),
            status.total_ports.len()
        )),
    ];
    if view.is_loading() {
        spans.push(Span::styled(
            "  agent thinking",
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_cells(f: &mut Frame, app: &App, area: Rect) {
    let block = panel("Cluster", app.focus() == Focus::Cells);
    let cells: Vec<ListItem> = app
        .view()
        .status()
        .cells()
        .map(|cell| {
            let (icon, chip) = if cell.alive {
                (icons::ALIVE, " ALIVE ")
            } else {
                (icons::DEAD, " DEAD ")
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{icon} "), theme::cell_style(cell.alive)),
                Span::raw(format!("{:<12}", cell.label())),
                Span::styled(chip, theme::cell_chip(cell.alive)),
            ]))
        })
        .collect();

    if cells.is_empty() {
        let empty = Paragraph::new("No cells reported").style(theme::DIM_STYLE).block(block);
        f.render_widget(empty, area);
        return;
    }

    let list = List::new(cells)
        .block(block)
        .highlight_style(theme::SELECTED_STYLE)
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.selected_index()));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_controls(f: &mut Frame, app: &App, area: Rect) {
    let hint = |key: &'static str, label: &'static str| {
        Line::from(vec![
            Span::styled(format!("{key:<7}"), Style::default().fg(Color::Cyan)),
            Span::raw(label),
        ])
    };
    let mut lines = vec![
        hint("Enter", "kill / revive selected"),
        hint("s", "start cluster"),
        hint("x", "stop cluster"),
        hint("r", "kill random cell"),
        hint("Tab", "chat with agent"),
    ];
    if let Some(note) = app.status_note() {
        lines.push(Line::from(Span::styled(note.to_string(), theme::DIM_STYLE)));
    }

    let controls = Paragraph::new(lines).block(panel("Controls", false));
    f.render_widget(controls, area);
}

fn render_logs(f: &mut Frame, app: &App, area: Rect) {
    let logs = app.view().logs();
    let height = area.height.saturating_sub(2) as usize;
    let start = logs.len().saturating_sub(height);
    let lines: Vec<Line> = logs[start..]
        .iter()
        .map(|line| Line::from(Span::styled(line.as_str(), theme::LOG_STYLE)))
        .collect();

    let paragraph = Paragraph::new(lines).block(panel("System Logs", false));
    f.render_widget(paragraph, area);
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let view = app.view();
    let width = area.width.saturating_sub(2);
    let height = area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = view
        .transcript()
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!("{}: ", theme::role_prefix(entry.role)),
                    theme::role_style(entry.role).add_modifier(Modifier::BOLD),
                ),
                Span::styled(entry.content.as_str(), theme::role_style(entry.role)),
            ])
        })
        .collect();
    if view.is_loading() {
        lines.push(Line::from(Span::styled("Thinking...", theme::DIM_STYLE)));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    let rows = paragraph.line_count(width);
    let scroll = rows.saturating_sub(height).min(u16::MAX as usize) as u16;
    let paragraph = paragraph
        .block(panel("Agent", app.focus() == Focus::Chat))
        .scroll((scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_input(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus() == Focus::Chat;
    let mut spans = vec![Span::raw(app.view().input())];
    if focused {
        spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }
    let title = if focused {
        "Message (Enter send, Esc back)"
    } else {
        "Message (Tab to chat, ? help)"
    };
    let input = Paragraph::new(Line::from(spans)).block(panel(title, focused));
    f.render_widget(input, area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let key = |keys: &'static str, label: &'static str| {
        Line::from(vec![
            Span::styled(format!("{keys:<12}"), Color::Cyan),
            Span::raw(label),
        ])
    };
    let text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        key("j / Down", "Next cell"),
        key("k / Up", "Previous cell"),
        key("Enter/Space", "Kill alive cell, revive dead one"),
        key("s", "Start cluster"),
        key("x", "Stop cluster"),
        key("r", "Kill a random alive cell"),
        key("Tab / i", "Focus chat"),
        key("Esc", "Back to cells"),
        key("?", "Toggle help"),
        key("q / Ctrl-C", "Quit"),
    ];
    f.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
