//! TUI for Tether using ratatui.

mod app;
mod format;
mod input;
mod theme;

pub use app::{App, AsyncCall, FanOutView, MAX_NOTICES, Notice, NoticeKind, Services};
pub use input::{Action, InputPump, action_for_key, apply_action, handle_events};
pub use theme::{Palette, palette, spinner_frame, styles};

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph},
};

use self::format::{format_elapsed, ratio, truncate_with_ellipsis};

const KEY_HINTS: &[(&str, &str)] = &[
    ("a", "async call"),
    ("s", "sync"),
    ("f", "fan-out"),
    ("c", "cancel fan-out"),
    ("x", "abort call"),
    ("q", "quit"),
];

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let palette = palette(app.high_contrast());
    let bg_block = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(3), // Label
            Constraint::Length(3), // Fan-out gauge
            Constraint::Min(3),    // Notices
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], &palette);
    draw_label(frame, app, chunks[1], &palette);
    draw_fan_out(frame, app, chunks[2], &palette);
    draw_notices(frame, app, chunks[3], &palette);
    draw_status_bar(frame, app, chunks[4], &palette);
}

fn panel(title: &str, palette: &Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette))
        .title(Span::styled(format!(" {title} "), styles::title(palette)))
        .style(Style::default().bg(palette.bg_panel))
}

fn draw_header(frame: &mut Frame, area: Rect, palette: &Palette) {
    let mut spans = vec![Span::styled("Tether ", styles::title(palette))];
    for (key, label) in KEY_HINTS {
        spans.push(Span::styled(format!(" {key}"), styles::key_highlight(palette)));
        spans.push(Span::styled(format!(" {label}"), styles::key_hint(palette)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_label(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let block = panel("Result", palette);
    let width = block.inner(area).width.saturating_sub(1) as usize;
    let text = truncate_with_ellipsis(app.label(), width);
    let label = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(text, Style::default().fg(palette.text_primary)),
    ]))
    .block(block);
    frame.render_widget(label, area);
}

fn draw_fan_out(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let block = panel("Fan-out", palette);

    let (done, total, label, color) = match app.fan_out() {
        FanOutView::Idle => (0, 0, "idle".to_string(), palette.text_muted),
        FanOutView::Running {
            progress,
            started,
            cancel_requested,
            ..
        } => {
            let state = if *cancel_requested {
                "cancelling"
            } else {
                "running"
            };
            (
                progress.done(),
                progress.total(),
                format!(
                    "{progress} ({state}, {})",
                    format_elapsed(started.elapsed())
                ),
                palette.accent,
            )
        }
        FanOutView::Finished { summary, elapsed } => {
            let color = if summary.failed > 0 {
                palette.error
            } else if summary.cancelled > 0 {
                palette.warning
            } else {
                palette.success
            };
            (
                summary.total(),
                summary.total(),
                format!(
                    "{} completed, {} cancelled, {} failed in {}",
                    summary.completed,
                    summary.cancelled,
                    summary.failed,
                    format_elapsed(*elapsed)
                ),
                color,
            )
        }
    };

    let filled = if matches!(app.fan_out(), FanOutView::Idle) {
        0.0
    } else {
        ratio(done, total)
    };
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(color).bg(palette.bg_dark))
        .ratio(filled)
        .label(Span::styled(
            label,
            Style::default()
                .fg(palette.text_primary)
                .add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(gauge, area);
}

fn draw_notices(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let block = panel("Activity", palette);
    let inner = block.inner(area);
    let width = inner.width.saturating_sub(3) as usize;
    let visible = inner.height as usize;

    let lines: Vec<Line> = app
        .notices()
        .rev()
        .take(visible)
        .map(|notice| {
            let color = match notice.kind {
                NoticeKind::Info => palette.text_secondary,
                NoticeKind::Success => palette.success,
                NoticeKind::Warning => palette.warning,
                NoticeKind::Error => palette.error,
            };
            Line::from(vec![
                Span::styled(" • ", Style::default().fg(color)),
                Span::styled(
                    truncate_with_ellipsis(&notice.text, width),
                    Style::default().fg(color),
                ),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub(crate) fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let (status_text, status_style) = match app.async_call() {
        AsyncCall::Running {
            started,
            abort_requested,
            ..
        } => {
            let spinner = spinner_frame(app.tick_count());
            let verb = if *abort_requested {
                "Aborting"
            } else {
                "Async call running"
            };
            (
                format!("{spinner} {verb} ({})", format_elapsed(started.elapsed())),
                Style::default().fg(palette.primary),
            )
        }
        AsyncCall::Idle if app.is_busy() => (
            format!("{} Fan-out in progress", spinner_frame(app.tick_count())),
            Style::default().fg(palette.accent),
        ),
        AsyncCall::Idle => (
            format!("● Ready │ Count is: {}", app.count()),
            Style::default().fg(palette.success),
        ),
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(status_text, status_style),
    ]));
    frame.render_widget(status, area);
}
