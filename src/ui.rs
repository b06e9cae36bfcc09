use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use cubik::{
    session::{TimerState, WARNING_WINDOW_MS},
    stats::SessionStats,
    util::{format_average, format_time},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const BLANK_TIME: &str = "--:--.---";

pub fn draw(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(5), // Scramble
            Constraint::Min(5),    // Timer
            Constraint::Length(9), // Stats + recent solves
            Constraint::Length(1), // Help
        ])
        .split(f.area());

    render_scramble(app, f, chunks[0]);
    render_timer(app, f, chunks[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    render_stats(app.session.stats(), f, bottom[0]);
    render_recent(app.session.stats(), f, bottom[1]);

    let help = Paragraph::new(Span::styled(
        "(space) start/stop / (r)eset / (n)ew scramble / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[3]);
}

fn render_scramble(app: &App, f: &mut Frame, area: Rect) {
    let scramble = app.session.scramble();
    let title = format!(
        "Scramble · {} moves · {}",
        scramble.len(),
        scramble.difficulty()
    );

    let widget = Paragraph::new(Line::from(Span::styled(
        scramble.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).title(title))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });

    f.render_widget(widget, area);
}

fn render_timer(app: &App, f: &mut Frame, area: Rect) {
    let session = &app.session;
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let (readout, style, status) = match session.state() {
        TimerState::Ready => (session.display(), bold, "Ready to start".to_string()),
        TimerState::Inspecting => {
            let remaining = session.inspection_remaining_ms().unwrap_or(0);
            let color = if remaining <= WARNING_WINDOW_MS {
                Color::Red
            } else {
                Color::Yellow
            };
            (
                format!("{}", remaining.div_ceil(1000)),
                bold.fg(color),
                "Inspecting...".to_string(),
            )
        }
        TimerState::Solving => (session.display(), bold.fg(Color::Green), "Solving...".to_string()),
        TimerState::Complete => (
            session.display(),
            bold.fg(Color::Cyan),
            format!("Completed: {}", session.display()),
        ),
    };

    let mut lines = vec![
        Line::from(Span::styled(readout, style)),
        Line::from(""),
        Line::from(Span::styled(
            status,
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];
    if let Some(warning) = &app.status {
        lines.push(Line::from(Span::styled(
            warning.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let top_padding = area.height.saturating_sub(lines.len() as u16) / 2;
    let padded = Rect {
        y: area.y + top_padding,
        height: area.height - top_padding,
        ..area
    };

    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), padded);
}

fn render_stats(stats: &SessionStats, f: &mut Frame, area: Rect) {
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<8}"), Style::default().add_modifier(Modifier::DIM)),
            Span::styled(value, Style::default().fg(Color::Cyan)),
        ])
    };

    let lines = vec![
        row("Solves", stats.solve_count.to_string()),
        row(
            "Best",
            stats.best_ms.map_or(BLANK_TIME.to_string(), format_time),
        ),
        row("ao5", stats.ao5.map_or(BLANK_TIME.to_string(), format_average)),
        row("ao12", stats.ao12.map_or(BLANK_TIME.to_string(), format_average)),
        row(
            "Mean",
            stats.session_mean.map_or(BLANK_TIME.to_string(), format_average),
        ),
    ];

    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Session"));
    f.render_widget(widget, area);
}

fn render_recent(stats: &SessionStats, f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = if stats.recent.is_empty() {
        vec![Line::from(vec![
            Span::styled("No solves yet  ", Style::default().add_modifier(Modifier::DIM)),
            Span::raw(BLANK_TIME),
        ])]
    } else {
        stats
            .recent
            .iter()
            .map(|recent| {
                Line::from(vec![
                    Span::raw(format!("Solve {:<6}", recent.position)),
                    Span::styled(
                        format_time(recent.solve.duration_ms),
                        Style::default().fg(Color::Cyan),
                    ),
                ])
            })
            .collect()
    };

    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Recent"));
    f.render_widget(widget, area);
}
