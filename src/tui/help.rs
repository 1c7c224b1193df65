use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:width$}{action}", "", width = pad)),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("g", 11, "Generate new sequence"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Enter", Style::default().fg(Color::Magenta)),
            Span::raw("   Start sorting"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("x", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Esc", Style::default().fg(Color::Magenta)),
            Span::raw("     Stop"),
        ]),
        key_line("a", 11, "Next algorithm"),
        key_line("1/2/3", 7, "Bubble / Selection / Insertion"),
        key_line("←/→", 9, "Array size -/+ 5"),
        key_line("-/+", 9, "Speed -/+ 5%"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Size, algorithm and generate are disabled while a sort runs."),
        Line::from("Speed can be changed at any time."),
        Line::from(""),
        Line::from("Colours:"),
        super::bars::legend_line(),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
