/*
[INPUT]:  AppState snapshot for the current frame
[OUTPUT]: Rendered search box, suggestion list, tick panel, logs, and footer
[POS]:    TUI rendering
[UPDATE]: When changing panel layout or row formats
*/

use chrono::DateTime;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap};

use crate::buffer::PriceTick;
use crate::stream::ConnectionState;

use super::app::{AppState, Tab};
use super::runtime::{border_style, error_style, highlight_style, LogBufferHandle};

pub(super) fn draw_ui(frame: &mut ratatui::Frame, app: &mut AppState) {
    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(area);

    match app.current_tab {
        Tab::Quotes => draw_quotes_tab(frame, layout[0], app),
        Tab::Logs => draw_logs(frame, layout[0], &app.log_buffer),
    }

    draw_tabs(frame, layout[1], app.current_tab);
    draw_footer(frame, layout[2], app);
}

fn draw_quotes_tab(frame: &mut ratatui::Frame, area: Rect, app: &mut AppState) {
    let content = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    draw_search_box(frame, content[0], app);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(content[1]);
    draw_suggestions(frame, panels[0], app);
    draw_ticks(frame, panels[1], app);
}

fn draw_search_box(frame: &mut ratatui::Frame, area: Rect, app: &AppState) {
    let widget = Paragraph::new(app.input.value()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style())
            .title("Search"),
    );
    frame.render_widget(widget, area);
    frame.set_cursor_position((
        area.x + 1 + app.input.visual_cursor() as u16,
        area.y + 1,
    ));
}

fn draw_suggestions(frame: &mut ratatui::Frame, area: Rect, app: &mut AppState) {
    let items: Vec<ListItem> = if app.suggestions.is_empty() {
        let placeholder = if app.input.value().trim().is_empty() {
            "Type to search symbols"
        } else {
            "No matches"
        };
        vec![ListItem::new(placeholder)]
    } else {
        app.suggestions
            .iter()
            .map(|candidate| {
                let line = format!(
                    "{} | {} ({})",
                    candidate.display_symbol, candidate.description, candidate.security_type
                );
                ListItem::new(line)
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style())
                .title("Matches"),
        )
        .highlight_style(highlight_style())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_ticks(frame: &mut ratatui::Frame, area: Rect, app: &AppState) {
    let title = match &app.selected {
        Some(candidate) => format!(
            "Prices: {} [{}]",
            candidate.display_symbol,
            if app.auto_update { "live" } else { "paused" }
        ),
        None => "Prices".to_string(),
    };

    let items: Vec<ListItem> = if app.ticks.is_empty() {
        vec![ListItem::new("No ticks yet")]
    } else {
        app.ticks.iter().map(|tick| ListItem::new(tick_row(tick))).collect()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style())
            .title(title),
    );
    frame.render_widget(list, area);
}

fn tick_row(tick: &PriceTick) -> String {
    let timestamp = DateTime::from_timestamp_millis(tick.timestamp_millis)
        .map(|dt| dt.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{timestamp} | {} | {} | {}",
        tick.symbol, tick.price, tick.volume
    )
}

fn draw_logs(frame: &mut ratatui::Frame, area: Rect, buffer: &LogBufferHandle) {
    let lines = {
        let guard = buffer.lock().expect("log buffer lock");
        guard.snapshot()
    };
    let available = area.height.saturating_sub(2) as usize;
    let start = lines.len().saturating_sub(available);
    let view = &lines[start..];

    let text = view
        .iter()
        .map(|line| Line::from(Span::raw(line.clone())))
        .collect::<Vec<_>>();
    let widget = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style())
            .title("Logs"),
    );
    frame.render_widget(widget, area);
}

fn draw_tabs(frame: &mut ratatui::Frame, area: Rect, current: Tab) {
    let selected = match current {
        Tab::Quotes => 0,
        Tab::Logs => 1,
    };
    let tabs = Tabs::new(vec!["Quotes", "Logs"])
        .select(selected)
        .highlight_style(highlight_style())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style())
                .title("Tabs"),
        );
    frame.render_widget(tabs, area);
}

fn draw_footer(frame: &mut ratatui::Frame, area: Rect, app: &AppState) {
    let key_style = Style::default().add_modifier(Modifier::BOLD);
    let line1 = Line::from(vec![
        Span::styled("[Up/Down]", key_style),
        Span::raw(" Select  "),
        Span::styled("[Enter]", key_style),
        Span::raw(" Go  "),
        Span::styled("[Tab]", key_style),
        Span::raw(" View  "),
        Span::styled("[Ctrl+P]", key_style),
        Span::raw(" Pause  "),
        Span::styled("[Esc]", key_style),
        Span::raw(" Clear  "),
        Span::styled("[Ctrl+Q]", key_style),
        Span::raw(" Quit"),
    ]);
    let line2 = match &app.error_message {
        Some(error) => Line::from(vec![
            Span::raw(format!("Stream: {}  |  ", connection_label(&app.connection))),
            Span::styled(error.clone(), error_style()),
        ]),
        None => Line::from(format!(
            "Stream: {}  |  {}",
            connection_label(&app.connection),
            app.status_message
        )),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .title("Hotkeys");
    let widget = Paragraph::new(Text::from(vec![line1, line2]))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

fn connection_label(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Idle => "idle".to_string(),
        ConnectionState::Connected => "connected".to_string(),
        ConnectionState::Disconnected { retry_count } => {
            format!("disconnected (retry {retry_count})")
        }
    }
}
