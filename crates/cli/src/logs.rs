//! `steplog logs`: print one step's log, optionally following it live.

use crate::render::format_line;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use colored::Colorize;
use sl_core::controller::FetchState;
use sl_core::controller::StepViewController;
use sl_core::render::sanitize_line;
use sl_core::render::LogPane;
use sl_core::render::LogSurface;
use sl_core::render::NotifyRedraw;
use sl_core::render::SanitizedLine;
use sl_core::transport::HttpTransport;
use sl_core::transport::LogTransport;
use sl_core::worker::LogWorker;
use sl_core::worker::StepView;
use sl_core::worker::WorkerSignal;
use sl_protocol::Execution;
use sl_protocol::ExecutionStatus;
use sl_protocol::GlobalConfig;
use sl_protocol::Notification;
use sl_protocol::NotificationLevel;
use sl_protocol::StepLogPath;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Writes lines to stdout as they are flushed. Printed output cannot be
/// taken back, so clearing only affects what comes next.
struct StdoutSurface {
    html: bool,
    written: usize,
}

impl LogSurface for StdoutSurface {
    fn append_lines(&mut self, lines: Vec<SanitizedLine>) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for line in &lines {
            let _ = writeln!(out, "{}", format_line(line, self.html));
        }
        let _ = out.flush();
        self.written += lines.len();
    }

    fn clear(&mut self) {}

    fn is_at_bottom(&self) -> bool {
        true
    }

    fn scroll_to_bottom(&mut self) {}
}

fn step_status(execution: &Execution, path: &StepLogPath) -> Option<ExecutionStatus> {
    execution
        .stage(path.stage)?
        .steps
        .iter()
        .find(|step| step.number == path.step)
        .map(|step| step.status)
}

fn print_notification(notification: &Notification) {
    let label = match notification.level {
        NotificationLevel::Info => "info".cyan(),
        NotificationLevel::Warning => "warning".yellow(),
        NotificationLevel::Error => "error".red(),
    };
    eprintln!("{label}: {}", notification.message);
}

pub async fn run(config: &GlobalConfig, path: StepLogPath, follow: bool, html: bool) -> Result<()> {
    let transport = Arc::new(HttpTransport::from_config(config));

    let execution = transport.fetch_execution(&path.execution).await?;
    let status = step_status(&execution, &path).ok_or_else(|| eyre!("No such step: {path}"))?;
    debug!(step = %path, %status, "resolved step");

    if !follow || status.is_terminal() || status == ExecutionStatus::Skipped {
        let lines = transport.fetch_logs(&path).await?;
        let mut surface = StdoutSurface { html, written: 0 };
        surface.append_lines(lines.iter().map(|line| sanitize_line(&line.out)).collect());
        return Ok(());
    }

    follow_step(config, transport, path, status, html).await
}

/// Stream a running step until it finishes.
async fn follow_step(
    config: &GlobalConfig,
    transport: Arc<HttpTransport>,
    path: StepLogPath,
    status: ExecutionStatus,
    html: bool,
) -> Result<()> {
    let execution_ref = path.execution.clone();
    let (worker, mut signals_rx) = LogWorker::new(transport);
    let redraw = NotifyRedraw::new();
    let frame_interval = Duration::from_millis(config.frame_interval_ms);

    let mut view = StepView::new(
        StepViewController::new(path.clone(), status).with_expanded(true),
        LogPane::new(StdoutSurface { html, written: 0 }, redraw.clone()),
    );
    view.start(&worker);

    let mut poll = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    poll.tick().await;
    let mut flush_at: Option<Instant> = None;

    loop {
        let deadline = flush_at.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            Some(signal) = signals_rx.recv() => {
                match signal {
                    WorkerSignal::Notify(notification) => print_notification(&notification),
                    WorkerSignal::Execution(Ok(execution)) => {
                        if let Some(status) = step_status(&execution, &path) {
                            view.set_status(status, &worker);
                        }
                    }
                    WorkerSignal::Execution(Err(err)) => {
                        print_notification(&Notification::error(format!("Failed to refresh execution: {err}")));
                    }
                    signal => {
                        view.handle_signal(&signal, &worker);
                    }
                }
            }
            _ = redraw.requested(), if flush_at.is_none() => {
                flush_at = Some(Instant::now() + frame_interval);
            }
            _ = tokio::time::sleep_until(deadline), if flush_at.is_some() => {
                flush_at = None;
                view.flush();
            }
            _ = poll.tick() => {
                worker.spawn_execution_fetch(execution_ref.clone());
            }
        }

        if is_done(&view) {
            view.flush();
            view.shutdown();
            return Ok(());
        }
    }
}

fn is_done(view: &StepView<StdoutSurface, NotifyRedraw>) -> bool {
    let controller = view.controller();
    if !controller.is_expanded() {
        return true;
    }
    if view.is_streaming() || !controller.status().is_terminal() {
        return controller.status() == ExecutionStatus::Skipped;
    }
    let streamed = view.pane().surface().written > 0 || view.pane().pending_len() > 0;
    streamed || matches!(controller.fetch_state(), FetchState::Loaded | FetchState::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_protocol::ExecutionRef;
    use sl_protocol::Stage;
    use sl_protocol::Step;

    #[test]
    fn test_step_status_lookup() {
        let execution = Execution {
            number: 1,
            status: ExecutionStatus::Running,
            stages: vec![Stage {
                number: 2,
                name: "build".to_string(),
                status: ExecutionStatus::Running,
                steps: vec![Step {
                    number: 3,
                    name: "compile".to_string(),
                    status: ExecutionStatus::Running,
                    started: 0,
                    stopped: 0,
                    exit_code: 0,
                    error: None,
                }],
            }],
        };
        let execution_ref = ExecutionRef::new("space/repo", "ci", 1);

        assert_eq!(
            step_status(&execution, &execution_ref.step(2, 3)),
            Some(ExecutionStatus::Running)
        );
        assert_eq!(step_status(&execution, &execution_ref.step(2, 4)), None);
        assert_eq!(step_status(&execution, &execution_ref.step(1, 3)), None);
    }
}
