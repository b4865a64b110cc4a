/*
 * This file is part of Sensorview.
 *
 * Copyright (C) 2025 Sensorview contributors
 *
 * Sensorview is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Sensorview is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Sensorview. If not, see <https://www.gnu.org/licenses/>.
 */

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::App;
use crate::snapshot::{VisibleRow, ERROR_MARKER, UNAVAILABLE};

const NAME_WIDTH: usize = 40;
const VALUE_WIDTH: usize = 14;

const HELP_TEXT: &str = "\
↑/↓ j/k        move selection
PgUp/PgDn      move by page
Home/End g/G   first / last row
Enter/Space    expand or collapse row
←/h  →/l       collapse (or go to parent) / expand
e / c          expand all / collapse all
/              search by name or value
i              toggle Additional info column
r              refresh now
q / Esc        quit";

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// One line of the tree: indented name with a fold marker, value, and
/// optionally the info column.
pub fn format_row(vr: &VisibleRow<'_>, expanded: bool, show_info: bool) -> String {
    let marker = if vr.row.children.is_empty() {
        "  "
    } else if expanded {
        "▾ "
    } else {
        "▸ "
    };
    let name = format!("{}{}{}", "  ".repeat(vr.depth), marker, vr.row.name);
    let mut line = format!("{:<nw$} {:>vw$}", name, vr.row.value, nw = NAME_WIDTH, vw = VALUE_WIDTH);
    if show_info {
        line.push_str("  ");
        line.push_str(&vr.row.info);
    }
    line
}

fn header_line(show_info: bool) -> String {
    let mut line = format!("{:<nw$} {:>vw$}", "Name", "Value", nw = NAME_WIDTH, vw = VALUE_WIDTH);
    if show_info {
        line.push_str("  Additional info");
    }
    line
}

fn value_style(value: &str, depth: usize) -> Style {
    match value {
        ERROR_MARKER => Style::default().fg(Color::Red),
        UNAVAILABLE => Style::default().fg(Color::DarkGray),
        _ if depth == 0 => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    }
}

pub fn ui(f: &mut Frame, app: &App) {
    let size = f.area();

    // Layout: header | tree | status
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1)])
        .split(size);

    render_header(f, app, chunks[0]);
    render_tree(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    if app.show_help_popup {
        render_help_popup(f, size);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let snap = app.refresher.snapshot();
    let text = format!(
        " sensorview | chips: {} | rows: {} | read failures: {} | refresh: {} ms | rebuilds: {} | dropped: {} ",
        snap.chip_count,
        snap.row_count,
        snap.read_failures,
        app.refresher.interval().as_millis(),
        app.refresher.rebuilds(),
        app.refresher.drops(),
    );
    let header = Paragraph::new(text).style(Style::default().fg(Color::Yellow));
    f.render_widget(header, area);
}

fn render_tree(f: &mut Frame, app: &App, area: Rect) {
    let snap = app.refresher.snapshot();
    let rows = app.visible_rows(&snap);

    let title = if app.search_input.is_empty() {
        format!(" SENSORS ({}) ", snap.chip_count)
    } else {
        format!(" SENSORS ({}) [filter: {}] ", snap.chip_count, app.search_input)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let highlight = Style::default().bg(Color::Blue).fg(Color::White);

    let mut items: Vec<ListItem> = Vec::with_capacity(rows.len() + 1);
    items.push(ListItem::new(header_line(app.show_info_column)).style(header_style));
    if rows.is_empty() {
        items.push(ListItem::new("(no sensors detected)"));
    }
    items.extend(rows.iter().map(|vr| {
        let expanded = app.expand.is_expanded(&vr.row.key) || !app.search_input.is_empty();
        ListItem::new(format_row(vr, expanded, app.show_info_column)).style(value_style(&vr.row.value, vr.depth))
    }));

    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(app.selected.min(rows.len() - 1) + 1));
    }

    let list = List::new(items).block(block).highlight_style(highlight);
    f.render_stateful_widget(list, area, &mut state);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if app.search_mode {
        (format!(" Search: {}_", app.search_input), Style::default().fg(Color::Cyan))
    } else if let Some(err) = &app.last_error {
        (format!(" Error: {}", err), Style::default().fg(Color::Red))
    } else {
        (format!(" {}", app.status), Style::default().fg(Color::Gray))
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

fn render_help_popup(f: &mut Frame, size: Rect) {
    let area = centered_rect(60, 60, size);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Help ");
    let help = Paragraph::new(HELP_TEXT)
        .block(block)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(help, area);
}
