use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Circle, Context},
        Paragraph, Widget, Wrap,
    },
};

use crate::{
    geometry::Point,
    presentation::{AlarmPresentation, INSTRUCTIONS, SENSOR_MISSING_MESSAGE},
};

/// Canvas units between concentric rings when filling a disc
const FILL_STEP: f64 = 4.0;
/// Upper bound on rings per disc, whatever the diameter
const MAX_RINGS: usize = 64;

pub fn render(presentation: &AlarmPresentation, area: Rect, buf: &mut Buffer) {
    let Some(session) = presentation.session() else {
        render_sensor_missing(area, buf);
        return;
    };

    let g = *session.geometry();
    let screen_height = g.screen_height;

    Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, g.screen_width.max(1.0)])
        .y_bounds([0.0, screen_height.max(1.0)])
        .paint(|ctx| {
            if let Some(target) = session.target() {
                fill_disc(ctx, target, g.target_diameter, screen_height, Color::Red);
            }
            // drawn on its own layer so it stays visible on top of the target
            ctx.layer();
            fill_disc(
                ctx,
                session.cursor(),
                g.cursor_diameter,
                screen_height,
                Color::Blue,
            );
        })
        .render(area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(2)
        .vertical_margin(1)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    Paragraph::new(Span::styled(
        INSTRUCTIONS,
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(chunks[0], buf);
}

/// Screen coordinates grow downwards, canvas coordinates grow upwards
fn fill_disc(ctx: &mut Context, top_left: Point, diameter: f64, screen_height: f64, color: Color) {
    let radius = diameter / 2.0;
    if !radius.is_finite() || radius <= 0.0 {
        return;
    }
    let center = top_left.center_of(diameter);
    let y = screen_height - center.y;
    let rings = ring_count(radius);
    for i in 0..rings {
        ctx.draw(&Circle {
            x: center.x,
            y,
            radius: radius * (rings - i) as f64 / rings as f64,
            color,
        });
    }
}

fn ring_count(radius: f64) -> usize {
    ((radius / FILL_STEP).ceil() as usize).clamp(1, MAX_RINGS)
}

fn render_sensor_missing(area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(1) / 2),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        SENSOR_MISSING_MESSAGE,
        Style::default().fg(Color::Red),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);
}
