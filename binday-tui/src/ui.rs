use binday_core::{
    coordinator::CoordinatorState,
    entity::{EntityDescriptor, EntityState, ViewKind},
    model::BinType,
};
use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
};

use crate::app::App;

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();
    let state = app.state();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let header = Paragraph::new(format!(
        "binday – Canterbury bin collections for UPRN {} / USRN {}",
        app.property.uprn, app.property.usrn
    ))
    .block(Block::default().borders(Borders::ALL).title("binday"));
    frame.render_widget(header, *header_area);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(*content_area);

    let [table_area, detail_area] = content_chunks.as_ref() else {
        return;
    };

    let rows = app.rows(&state);
    draw_entities(frame, app, &rows, *table_area);
    if let Some((entity, entity_state)) = rows.get(app.entity_index) {
        draw_details(frame, &entity.name, &entity.unique_id, entity_state, *detail_area);
    }

    draw_status(frame, &state, *status_area);
}

fn draw_entities(
    frame: &mut Frame<'_>,
    app: &App,
    rows: &[(&EntityDescriptor, EntityState)],
    area: Rect,
) {
    let table_rows = rows.iter().map(|(entity, entity_state)| {
        let value = entity_state.value.as_deref().unwrap_or("unknown");
        let summary = match entity.kind {
            ViewKind::Next => attribute(entity_state, "days_until")
                .and_then(|days| days.parse::<i64>().ok())
                .map_or_else(|| "no collection scheduled".to_owned(), relative_day_label),
            ViewKind::Last => attribute(entity_state, "outcome")
                .map_or_else(|| "no report".to_owned(), str::to_owned),
        };

        Row::new(vec![
            Cell::from(entity.name.clone()),
            Cell::from(value.to_owned()),
            Cell::from(summary),
        ])
        .style(Style::default().fg(bin_color(entity.bin)))
    });

    let column_widths = [
        Constraint::Length(28),
        Constraint::Length(22),
        Constraint::Min(12),
    ];

    let table = Table::new(table_rows, column_widths)
        .header(
            Row::new(vec!["Entity", "Value", "Summary"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Entities (↑/↓ to select)"),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .column_spacing(1);

    let mut table_state = TableState::default();
    if !rows.is_empty() {
        table_state.select(Some(app.entity_index));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn draw_details(
    frame: &mut Frame<'_>,
    name: &str,
    unique_id: &str,
    entity_state: &EntityState,
    area: Rect,
) {
    let mut lines = vec![
        Line::from(Span::styled(unique_id.to_owned(), Style::default().fg(Color::DarkGray))),
        Line::from(format!(
            "state: {}",
            entity_state.value.as_deref().unwrap_or("unknown")
        )),
        Line::from(""),
    ];
    if entity_state.attributes.is_empty() {
        lines.push(Line::from("No attributes"));
    }
    for (key, value) in &entity_state.attributes {
        lines.push(Line::from(vec![
            Span::styled(format!("{key}: "), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(value.clone()),
        ]));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(name.to_owned()))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_status(frame: &mut Frame<'_>, state: &CoordinatorState, area: Rect) {
    let nav_hint = "↑/↓ move · q/Esc/Ctrl-C quit";

    let freshness = match &state.data {
        Some(snapshot) => format!(
            "Updated {}",
            snapshot
                .fetched_at
                .with_timezone(&Local)
                .format("%d.%m.%Y %H:%M:%S")
        ),
        None => "No data yet".to_owned(),
    };

    let (status_text, status_style) = match &state.last_failure {
        Some(failure) => (
            format!(
                "{freshness} · last refresh failed at {}: {} · {nav_hint}",
                failure.at.with_timezone(&Local).format("%H:%M:%S"),
                failure.message
            ),
            Style::default().fg(Color::Red),
        ),
        None => (format!("{freshness} · {nav_hint}"), Style::default()),
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, area);
}

fn attribute<'a>(entity_state: &'a EntityState, name: &str) -> Option<&'a str> {
    entity_state
        .attributes
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.as_str())
}

fn bin_color(bin: BinType) -> Color {
    match bin {
        BinType::Black => Color::Gray,
        BinType::Recycling => Color::Blue,
        BinType::Garden => Color::Green,
        BinType::Food => Color::Yellow,
    }
}

fn relative_day_label(delta: i64) -> String {
    match delta {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        days if days > 1 => format!("in {days} days"),
        -1 => "yesterday".to_owned(),
        days => format!("{} days ago", days.abs()),
    }
}
