//! Step table for the watched stage.
//!
//! One row per step: an expand marker, the status, the name and the
//! duration once the step has finished.

use chrono::Duration;
use ratatui::layout::Constraint;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Cell;
use ratatui::widgets::Row;
use ratatui::widgets::Table;
use ratatui::widgets::TableState;
use ratatui::Frame;
use sl_protocol::ExecutionStatus;
use sl_protocol::Step;

/// What the table needs to know about one step.
#[derive(Debug, Clone, Copy)]
pub struct StepRow<'a> {
    pub step: &'a Step,
    pub expanded: bool,
    pub streaming: bool,
}

pub fn status_style(status: ExecutionStatus) -> Style {
    match status {
        ExecutionStatus::Pending => Style::default().fg(Color::Yellow),
        ExecutionStatus::Running => Style::default().fg(Color::Green),
        ExecutionStatus::Success => Style::default().fg(Color::Cyan),
        ExecutionStatus::Failure => Style::default().fg(Color::Red),
        ExecutionStatus::Error => Style::default().fg(Color::LightRed),
        ExecutionStatus::Skipped => Style::default().fg(Color::DarkGray),
    }
}

/// Compact human duration: `42s`, `1m 5s`, `2h 3m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m}m")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

pub fn render_step_list(frame: &mut Frame, area: Rect, title: &str, rows: &[StepRow<'_>], selected: usize) {
    let table_rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            let marker = if row.expanded { "▾" } else { "▸" };
            let status = if row.streaming {
                format!("{} ●", row.step.status)
            } else {
                row.step.status.to_string()
            };
            let duration = row.step.duration().map(format_duration).unwrap_or_default();

            Row::new(vec![
                Cell::from(marker),
                Cell::from(status).style(status_style(row.step.status)),
                Cell::from(row.step.name.clone()),
                Cell::from(duration),
            ])
        })
        .collect();

    let header = Row::new(vec![
        Cell::from(""),
        Cell::from("Status"),
        Cell::from("Step"),
        Cell::from("Time"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan));

    let widths = [
        Constraint::Length(1),
        Constraint::Length(10),
        Constraint::Min(10),
        Constraint::Length(8),
    ];

    let table = Table::new(table_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");

    let mut table_state = TableState::default();
    if !rows.is_empty() {
        table_state.select(Some(selected));
    }

    frame.render_stateful_widget(table, area, &mut table_state);
}
