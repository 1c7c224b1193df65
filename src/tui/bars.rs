//! Bar renderer.
//!
//! Draws the sequence as vertical bars on a braille canvas. Rendering is a pure
//! function of the sequence and the role map of the latest step.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::canvas::{Canvas, Context, Line as CanvasLine},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::collections::BTreeMap;

use crate::model::Role;

/// Used for layout maths when the area has no usable size yet.
pub const FALLBACK_WIDTH: u16 = 80;
pub const FALLBACK_HEIGHT: u16 = 20;

/// Minimum character columns per bar before value labels are printed.
const LABEL_MIN_COLUMNS: f64 = 4.0;

pub fn role_color(role: Option<Role>) -> Color {
    match role {
        None => Color::Cyan,
        Some(Role::Compared) => Color::Red,
        Some(Role::Swapping) => Color::Yellow,
        Some(Role::Settled) => Color::Green,
        Some(Role::Pivot) => Color::Magenta,
    }
}

/// Helper function to draw a line on a canvas
pub fn draw_line(ctx: &mut Context, x1: f64, y1: f64, x2: f64, y2: f64, color: Color) {
    ctx.draw(&CanvasLine {
        x1,
        y1,
        x2,
        y2,
        color,
    });
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeom {
    /// Left edge in sequence units (bar `i` spans `i..i + 1`).
    pub x: f64,
    /// Height normalised to the tallest value, in `0.0..=1.0`.
    pub height: f64,
    pub value: u32,
    pub color: Color,
}

pub fn bar_geometry(sequence: &[u32], roles: &BTreeMap<usize, Role>) -> Vec<BarGeom> {
    let max = sequence.iter().copied().max().unwrap_or(0);
    sequence
        .iter()
        .enumerate()
        .map(|(i, &value)| BarGeom {
            x: i as f64,
            height: if max == 0 {
                0.0
            } else {
                f64::from(value) / f64::from(max)
            },
            value,
            color: role_color(roles.get(&i).copied()),
        })
        .collect()
}

/// Area size, falling back to defaults for zero-sized areas.
pub fn effective_size(area: Rect) -> (u16, u16) {
    let w = if area.width == 0 {
        FALLBACK_WIDTH
    } else {
        area.width
    };
    let h = if area.height == 0 {
        FALLBACK_HEIGHT
    } else {
        area.height
    };
    (w, h)
}

pub fn render_bars(
    f: &mut Frame,
    area: Rect,
    sequence: &[u32],
    roles: &BTreeMap<usize, Role>,
    title: Line,
) {
    let block = Block::default().borders(Borders::ALL).title(title);
    if area.width == 0 || area.height == 0 {
        return;
    }
    if sequence.is_empty() {
        let p = Paragraph::new("No data. Press g to generate a sequence.").block(block);
        f.render_widget(p, area);
        return;
    }

    let (width, _) = effective_size(block.inner(area));
    let n = sequence.len() as f64;
    let columns_per_bar = f64::from(width) / n;
    // Braille gives two horizontal dots per column.
    let dots_per_bar = (columns_per_bar * 2.0).floor().max(1.0);
    // Leave one dot of gap when there is room for it.
    let strokes = if dots_per_bar >= 2.0 {
        dots_per_bar as usize - 1
    } else {
        1
    };
    let show_labels = columns_per_bar >= LABEL_MIN_COLUMNS;
    let bars = bar_geometry(sequence, roles);

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([0.0, n])
        .y_bounds([0.0, if show_labels { 1.12 } else { 1.0 }])
        .paint(move |ctx| {
            for bar in &bars {
                for k in 0..strokes {
                    let x = bar.x + (k as f64 + 0.5) / dots_per_bar;
                    draw_line(ctx, x, 0.0, x, bar.height, bar.color);
                }
            }
            if show_labels {
                for bar in &bars {
                    ctx.print(
                        bar.x + 0.1,
                        bar.height + 0.08,
                        Span::styled(bar.value.to_string(), Style::default().fg(Color::White)),
                    );
                }
            }
        });
    f.render_widget(canvas, area);
}

/// One-line colour legend for the bar roles.
pub fn legend_line() -> Line<'static> {
    let item = |label: &'static str, role: Option<Role>| {
        vec![
            Span::styled("■ ", Style::default().fg(role_color(role))),
            Span::raw(label),
            Span::raw("   "),
        ]
    };
    let mut spans = Vec::new();
    spans.extend(item("Normal", None));
    spans.extend(item("Comparing", Some(Role::Compared)));
    spans.extend(item("Swapping", Some(Role::Swapping)));
    spans.extend(item("Sorted", Some(Role::Settled)));
    spans.extend(item("Pivot", Some(Role::Pivot)));
    Line::from(spans)
}
