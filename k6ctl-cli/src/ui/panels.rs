//! Status, metrics and debug panels.

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use k6ctl_core::chart::TIME_LABEL_FORMAT;
use k6ctl_core::history::History;
use k6ctl_core::rates::{Rate, RateModel};

use super::{Notice, NoticeLevel, styles};

const LABEL_WIDTH: usize = 10;
const METRIC_LABEL_WIDTH: usize = 15;

fn panel_block(title: &str) -> Block<'static> {
    Block::default()
        .title(Span::styled(format!(" {} ", title), styles::title()))
        .borders(Borders::ALL)
        .border_style(styles::border())
        .style(styles::panel())
}

fn notice_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Info => styles::panel(),
        NoticeLevel::Warn => styles::warn(),
        NoticeLevel::Error => styles::error(),
    }
}

fn label(text: &str) -> Span<'static> {
    Span::styled(format!("{:<width$}", text, width = LABEL_WIDTH), styles::text_dim())
}

fn flag(value: bool) -> Span<'static> {
    Span::styled(format!(" {} ", value), styles::value())
}

fn hint(text: &str) -> Span<'static> {
    Span::styled(format!("  {}", text), styles::key_hint())
}

/// Run state and VU counts from the latest status. `notice` goes into the
/// bottom border, used when there is no debug strip.
pub fn status_panel<'a>(history: &'a History, notice: Option<&'a Notice>) -> Paragraph<'a> {
    let mut block = panel_block("k6 test status");
    if let Some(notice) = notice {
        block = block.title_bottom(Span::styled(
            format!(" {} ", notice.text),
            notice_style(notice.level),
        ));
    }

    let Some(latest) = history.latest_status() else {
        let waiting = Line::from(Span::styled("waiting for k6...", styles::text_dim()));
        return Paragraph::new(vec![waiting]).block(block);
    };
    let status = &latest.value;

    let lines = vec![
        Line::from(vec![label("Running"), flag(status.running)]),
        Line::from(vec![
            label("Paused"),
            flag(status.paused),
            hint("(P = toggle)"),
        ]),
        Line::from(vec![label("Tainted"), flag(status.tainted)]),
        Line::from(""),
        Line::from(vec![
            label("vus-max"),
            Span::styled(format!(" {} ", status.vus_max), styles::value()),
        ]),
        Line::from(vec![
            label("vus"),
            Span::styled(format!(" {} ", status.vus), styles::value()),
            hint("(+/- to change)"),
        ]),
    ];

    Paragraph::new(lines).block(block)
}

fn format_rate(rate: Rate) -> String {
    match rate.per_second() {
        Some(r) => format!("{:>12.2}/s", r),
        None => format!("{:>14}", "n/a"),
    }
}

/// One row per tracked counter: label, per-second rate, latest count
pub fn metrics_panel<'a>(history: &'a History, rates: &'a RateModel) -> Paragraph<'a> {
    let latest = history.metrics().last();

    let lines: Vec<Line> = rates
        .lines
        .iter()
        .map(|line| {
            let count = latest
                .and_then(|m| m.value.get(&line.id))
                .and_then(|c| c.count)
                .map(|c| format!("  ({:.0})", c))
                .unwrap_or_default();
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}", line.label, width = METRIC_LABEL_WIDTH),
                    styles::text_dim(),
                ),
                Span::styled(format_rate(line.rate), styles::panel()),
                Span::styled(count, styles::text_dim()),
            ])
        })
        .collect();

    Paragraph::new(lines).block(panel_block("metrics"))
}

/// Latest notice, poll summary and key hints
pub fn debug_panel<'a>(
    history: &'a History,
    notice: Option<&'a Notice>,
    pending: usize,
) -> Paragraph<'a> {
    let notice_line = match notice {
        Some(n) => Line::from(vec![
            Span::styled(
                format!("[{}] ", n.at.format(TIME_LABEL_FORMAT)),
                styles::text_dim(),
            ),
            Span::styled(n.text.clone(), notice_style(n.level)),
        ]),
        None => Line::from(""),
    };

    let mut summary = match history.latest_status() {
        Some(s) => format!(
            "last poll {} | {} samples",
            s.at.format(TIME_LABEL_FORMAT),
            history.len()
        ),
        None => "no data yet".to_string(),
    };
    if pending > 0 {
        summary.push_str(&format!(" | {} command(s) queued", pending));
    }

    let keys = Line::from(vec![
        Span::styled("q = quit", styles::key_hint()),
        Span::styled("  p = pause/resume", styles::key_hint()),
        Span::styled("  +/- = VUs", styles::key_hint()),
    ]);

    let lines = vec![
        notice_line,
        Line::from(Span::styled(summary, styles::text_dim())),
        keys,
    ];
    Paragraph::new(lines).block(panel_block("debug"))
}
