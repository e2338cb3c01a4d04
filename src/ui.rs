pub mod ringing;

use chrono::{Local, Timelike};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::{
    app::{App, AppState, Field},
    schedule::{format_12h, format_countdown},
};

const HORIZONTAL_MARGIN: u16 = 5;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (self.state, self.presentation.as_ref()) {
            (AppState::Ringing, Some(presentation)) => ringing::render(presentation, area, buf),
            _ => render_scheduler(self, area, buf),
        }
    }
}

fn render_scheduler(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let focused_style = Style::default()
        .patch(bold_style)
        .fg(Color::Cyan)
        .add_modifier(Modifier::UNDERLINED);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let content_height = 9;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(area.height.saturating_sub(content_height) / 2),
            Constraint::Length(2), // title
            Constraint::Length(2), // selected time
            Constraint::Length(2), // status
            Constraint::Length(2), // countdown
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "Tilt-o-Clock",
        Style::default().patch(bold_style).fg(Color::Magenta),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let picked = app.picker.time();
    let (pm, hour12) = picked.hour12();
    let field_style = |field: Field| {
        if app.picker.field == field {
            focused_style
        } else {
            bold_style
        }
    };
    Paragraph::new(Line::from(vec![
        Span::styled("Selected Time: ", dim_style),
        Span::styled(format!("{:02}", hour12), field_style(Field::Hour)),
        Span::styled(":", bold_style),
        Span::styled(format!("{:02}", app.picker.minute), field_style(Field::Minute)),
        Span::styled(if pm { " PM" } else { " AM" }, bold_style),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    if let Some(status) = &app.status {
        Paragraph::new(Span::styled(
            status.as_str(),
            Style::default().fg(Color::Green).patch(italic_style),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);
    }

    if let Some(entry) = app.registry.next_pending() {
        let remaining = entry.fire_at - Local::now();
        Paragraph::new(Span::styled(
            format!(
                "Rings at {} (in {})",
                format_12h(&entry.fire_at),
                format_countdown(remaining)
            ),
            dim_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled(
        "(↑/↓) adjust / (←/→) hour·minute / (enter) set alarm / (c)ancel / (r)ing now / (esc)ape",
        italic_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[6], buf);
}
