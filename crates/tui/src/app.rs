//! TUI application state and event loop.
//!
//! [`App`] watches one stage of an execution. It polls the execution for
//! status changes, keeps one [`StepView`] per step, and runs everything on a
//! single `tokio::select!` loop: worker signals, terminal input, and the
//! poll timer.

use crate::event_handler;
use crate::event_handler::KeyAction;
use crate::tui::FrameRequester;
use crate::tui::Tui;
use crate::tui::TuiEvent;
use crate::widgets::render_step_list;
use crate::widgets::LogViewport;
use crate::widgets::StatusLine;
use crate::widgets::StepRow;
use anyhow::Result;
use ratatui::layout::Constraint;
use ratatui::layout::Direction;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use sl_core::controller::FetchState;
use sl_core::controller::StepViewController;
use sl_core::render::LogPane;
use sl_core::render::LogSurface;
use sl_core::transport::StreamEvent;
use sl_core::worker::LogWorker;
use sl_core::worker::StepView;
use sl_core::worker::WorkerSignal;
use sl_protocol::Execution;
use sl_protocol::ExecutionRef;
use sl_protocol::Notification;
use sl_protocol::Stage;
use sl_protocol::Step;
use std::time::Duration;
use std::time::Instant;
use tokio::select;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tracing::info;
use tracing::warn;

pub type TuiStepView = StepView<LogViewport, FrameRequester>;

pub struct App {
    execution_ref: ExecutionRef,
    /// Stage requested on the command line, if any.
    wanted_stage: Option<i64>,
    /// Latest copy of the watched stage.
    stage: Option<Stage>,
    /// One view per step of `stage`, in the same order.
    views: Vec<TuiStepView>,
    pub selected_index: usize,
    pub status_line: StatusLine,
    /// Set once the execution reached a final status; polling stops.
    execution_done: bool,
    pub should_exit: bool,
    worker: LogWorker,
    signals_rx: UnboundedReceiver<WorkerSignal>,
    frame_requester: FrameRequester,
    poll_interval: Duration,
}

impl App {
    pub fn new(
        execution_ref: ExecutionRef,
        wanted_stage: Option<i64>,
        worker: LogWorker,
        signals_rx: UnboundedReceiver<WorkerSignal>,
        frame_requester: FrameRequester,
        poll_interval: Duration,
    ) -> Self {
        Self {
            execution_ref,
            wanted_stage,
            stage: None,
            views: Vec::new(),
            selected_index: 0,
            status_line: StatusLine::new(),
            execution_done: false,
            should_exit: false,
            worker,
            signals_rx,
            frame_requester,
            poll_interval,
        }
    }

    pub fn views(&self) -> &[TuiStepView] {
        &self.views
    }

    /// Main event loop.
    pub async fn run(&mut self, tui: &mut Tui) -> Result<()> {
        let mut tui_events = tui.event_stream();
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.frame_requester.schedule_frame();

        while !self.should_exit {
            select! {
                Some(signal) = self.signals_rx.recv() => {
                    self.handle_signal(signal);
                }
                Some(tui_event) = tui_events.next() => {
                    self.handle_tui_event(tui, tui_event)?;
                }
                _ = poll.tick(), if !self.execution_done => {
                    self.worker.spawn_execution_fetch(self.execution_ref.clone());
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        for view in &mut self.views {
            view.shutdown();
        }
    }

    /// Apply a result of background work.
    pub fn handle_signal(&mut self, signal: WorkerSignal) {
        match signal {
            WorkerSignal::Notify(notification) => self.notify(notification),
            WorkerSignal::Execution(Ok(execution)) => {
                self.apply_execution(&execution);
                self.frame_requester.schedule_frame();
            }
            WorkerSignal::Execution(Err(err)) => {
                warn!(error = %err, "failed to refresh execution");
                self.notify(Notification::error(format!(
                    "Failed to refresh execution: {err}"
                )));
            }
            signal => {
                let live_line = matches!(
                    signal,
                    WorkerSignal::Stream {
                        event: StreamEvent::Message(_),
                        ..
                    }
                );
                let worker = &self.worker;
                if !self
                    .views
                    .iter_mut()
                    .any(|view| view.handle_signal(&signal, worker))
                {
                    return;
                }
                // Live lines are drawn by the batcher's own redraw request.
                if !live_line {
                    self.frame_requester.schedule_frame();
                }
            }
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.status_line.push(notification, Instant::now());
        self.frame_requester.schedule_frame();
    }

    /// Reconcile the step views with a fresh copy of the execution.
    pub fn apply_execution(&mut self, execution: &Execution) {
        if execution.status.is_terminal() && !self.execution_done {
            info!(execution = execution.number, status = %execution.status, "execution finished");
            self.execution_done = true;
        }

        let Some(stage) = event_handler::pick_stage(execution, self.wanted_stage) else {
            if let Some(number) = self.wanted_stage {
                self.execution_done = true;
                self.notify(Notification::error(format!(
                    "Stage {number} not found in execution {}",
                    execution.number
                )));
            }
            return;
        };

        let same_stage = self
            .stage
            .as_ref()
            .is_some_and(|current| current.number == stage.number);

        if !same_stage {
            self.shutdown();
            self.views.clear();
            self.selected_index = event_handler::initial_selection(&stage.steps);
        }

        let previous_steps = match (&self.stage, same_stage) {
            (Some(previous), true) => previous.steps.as_slice(),
            _ => &[],
        };

        for (index, step) in stage.steps.iter().enumerate() {
            let reusable = index < self.views.len()
                && previous_steps
                    .get(index)
                    .is_some_and(|previous| is_same_run(previous, step));
            if reusable {
                self.views[index].set_status(step.status, &self.worker);
            } else {
                for mut stale in self.views.drain(index..) {
                    stale.shutdown();
                }
                let view = self.new_view(stage.number, step);
                self.views.push(view);
            }
        }

        for mut stale in self.views.drain(stage.steps.len().min(self.views.len())..) {
            stale.shutdown();
        }

        self.selected_index = self.selected_index.min(self.views.len().saturating_sub(1));
        self.stage = Some(stage.clone());
    }

    fn new_view(&self, stage_number: i64, step: &Step) -> TuiStepView {
        let path = self.execution_ref.step(stage_number, step.number);
        let mut view = StepView::new(
            StepViewController::new(path, step.status),
            LogPane::new(LogViewport::new(), self.frame_requester.clone()),
        );
        view.start(&self.worker);
        view
    }

    fn handle_tui_event(&mut self, tui: &mut Tui, event: TuiEvent) -> Result<()> {
        match event {
            TuiEvent::Key(key_event) => {
                self.handle_key_action(event_handler::key_action(key_event));
                self.frame_requester.schedule_frame();
            }
            TuiEvent::Draw => {
                self.prepare_frame(Instant::now());
                tui.draw(|frame| self.render(frame))?;
            }
        }
        Ok(())
    }

    /// Flush pending live lines and expire old notifications before drawing.
    fn prepare_frame(&mut self, now: Instant) {
        for view in &mut self.views {
            view.flush();
        }
        if let Some(expires) = self.status_line.expire(now) {
            self.frame_requester
                .schedule_frame_in(expires.saturating_duration_since(now));
        }
    }

    pub fn handle_key_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::Quit => self.should_exit = true,
            KeyAction::SelectPrevious => {
                self.selected_index = self.selected_index.saturating_sub(1);
            }
            KeyAction::SelectNext => {
                if self.selected_index + 1 < self.views.len() {
                    self.selected_index += 1;
                }
            }
            KeyAction::ToggleStep => {
                if let Some(view) = self.views.get_mut(self.selected_index) {
                    view.toggle(&self.worker);
                }
            }
            KeyAction::None => {}
            scroll => {
                if let Some(view) = self.views.get_mut(self.selected_index) {
                    let viewport = view.pane_mut().surface_mut();
                    match scroll {
                        KeyAction::ScrollUp => viewport.scroll_up(),
                        KeyAction::ScrollDown => viewport.scroll_down(),
                        KeyAction::PageUp => viewport.page_up(),
                        KeyAction::PageDown => viewport.page_down(),
                        KeyAction::ScrollToTop => viewport.scroll_to_top(),
                        KeyAction::ScrollToBottom => viewport.scroll_to_bottom(),
                        _ => {}
                    }
                }
            }
        }
    }

    /// Render the TUI: step table, selected step's log, status line.
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_steps(frame, chunks[0]);
        self.render_log(frame, chunks[1]);
        self.status_line.render(frame, chunks[2]);
    }

    fn render_steps(&self, frame: &mut Frame, area: Rect) {
        let Some(stage) = &self.stage else {
            let block = Block::default()
                .borders(Borders::ALL)
                .title(self.execution_title());
            frame.render_widget(
                Paragraph::new("Loading execution...")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(block),
                area,
            );
            return;
        };

        let rows: Vec<StepRow<'_>> = stage
            .steps
            .iter()
            .zip(&self.views)
            .map(|(step, view)| StepRow {
                step,
                expanded: view.is_expanded(),
                streaming: view.is_streaming(),
            })
            .collect();

        let title = format!("{} - stage {} ({})", self.execution_title(), stage.name, stage.status);
        render_step_list(frame, area, &title, &rows, self.selected_index);
    }

    fn render_log(&mut self, frame: &mut Frame, area: Rect) {
        let step_name = self
            .stage
            .as_ref()
            .and_then(|stage| stage.steps.get(self.selected_index))
            .map(|step| step.name.clone())
            .unwrap_or_default();

        let Some(view) = self.views.get_mut(self.selected_index) else {
            let block = Block::default().borders(Borders::ALL).title("Log");
            frame.render_widget(Paragraph::new("No step selected.").block(block), area);
            return;
        };

        if !view.is_expanded() {
            let block = Block::default().borders(Borders::ALL).title(step_name);
            frame.render_widget(
                Paragraph::new("Collapsed. Press enter to show the log.")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(block),
                area,
            );
            return;
        }

        let placeholder = if view.is_streaming() {
            "Waiting for output..."
        } else {
            match view.controller().fetch_state() {
                FetchState::InFlight(_) => "Loading log...",
                FetchState::Failed => "Could not load the log. Collapse and expand to retry.",
                FetchState::Lazy | FetchState::Loaded => "No output.",
            }
        };

        view.pane_mut()
            .surface_mut()
            .render(frame, area, &step_name, placeholder);
    }

    fn execution_title(&self) -> String {
        format!(
            "{} / {} #{}",
            self.execution_ref.repo_path, self.execution_ref.pipeline, self.execution_ref.execution
        )
    }
}

/// Whether `current` is the same run of the step as `previous`. A restarted
/// step gets a new start time and so a fresh view.
fn is_same_run(previous: &Step, current: &Step) -> bool {
    previous.number == current.number
        && previous.name == current.name
        && previous.started == current.started
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use crossterm::event::KeyEvent;
    use pretty_assertions::assert_eq;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use sl_core::transport::ScriptedTransport;
    use sl_core::transport::TransportCall;
    use sl_protocol::ExecutionStatus;
    use sl_protocol::LiveLogLine;
    use std::sync::Arc;

    fn execution_ref() -> ExecutionRef {
        ExecutionRef::new("space/repo", "ci", 3)
    }

    fn step(number: i64, name: &str, status: ExecutionStatus) -> Step {
        Step {
            number,
            name: name.to_string(),
            status,
            started: 0,
            stopped: 0,
            exit_code: 0,
            error: None,
        }
    }

    fn execution(status: ExecutionStatus, steps: Vec<Step>) -> Execution {
        Execution {
            number: 3,
            status,
            stages: vec![Stage {
                number: 1,
                name: "default".to_string(),
                status,
                steps,
            }],
        }
    }

    fn app(transport: Arc<ScriptedTransport>) -> App {
        let (worker, signals_rx) = LogWorker::new(transport);
        App::new(
            execution_ref(),
            None,
            worker,
            signals_rx,
            FrameRequester::detached(),
            Duration::from_secs(2),
        )
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_renders_loading_state() {
        let mut app = app(Arc::new(ScriptedTransport::new()));

        let content = screen(&mut app);

        assert!(content.contains("space/repo / ci #3"));
        assert!(content.contains("Loading execution..."));
    }

    #[tokio::test]
    async fn test_apply_execution_creates_views_and_selects_running_step() {
        let transport = Arc::new(ScriptedTransport::new());
        let _stream = transport.push_stream(&execution_ref().step(1, 2));
        let mut app = app(transport.clone());

        app.apply_execution(&execution(
            ExecutionStatus::Running,
            vec![
                step(1, "clone", ExecutionStatus::Success),
                step(2, "test", ExecutionStatus::Running),
                step(3, "deploy", ExecutionStatus::Pending),
            ],
        ));

        assert_eq!(app.views().len(), 3);
        assert_eq!(app.selected_index, 1);
        assert!(!app.views()[0].is_expanded());
        assert!(app.views()[1].is_streaming());

        let content = screen(&mut app);
        assert!(content.contains("clone"));
        assert!(content.contains("deploy"));
        assert!(content.contains("Waiting for output..."));
    }

    #[tokio::test]
    async fn test_streamed_lines_show_after_draw() {
        let transport = Arc::new(ScriptedTransport::new());
        let stream = transport.push_stream(&execution_ref().step(1, 1));
        let mut app = app(transport);
        app.apply_execution(&execution(
            ExecutionStatus::Running,
            vec![step(1, "build", ExecutionStatus::Running)],
        ));

        stream
            .send(StreamEvent::Message(r#"{"out":"compiling\n"}"#.to_string()))
            .unwrap();
        let signal = app.signals_rx.recv().await.unwrap();
        app.handle_signal(signal);
        app.prepare_frame(Instant::now());

        assert!(screen(&mut app).contains("compiling"));
    }

    #[tokio::test]
    async fn test_status_change_switches_to_history() {
        let transport = Arc::new(ScriptedTransport::new());
        let path = execution_ref().step(1, 1);
        let _stream = transport.push_stream(&path);
        transport.set_logs(
            &path,
            Ok(vec![LiveLogLine {
                pos: 0,
                out: "error: tests failed".to_string(),
                time: 0,
            }]),
        );
        let mut app = app(transport.clone());
        app.apply_execution(&execution(
            ExecutionStatus::Running,
            vec![step(1, "test", ExecutionStatus::Running)],
        ));
        tokio::task::yield_now().await;

        app.apply_execution(&execution(
            ExecutionStatus::Failure,
            vec![step(1, "test", ExecutionStatus::Failure)],
        ));
        let signal = app.signals_rx.recv().await.unwrap();
        app.handle_signal(signal);

        assert!(!app.views()[0].is_streaming());
        assert!(transport.calls().contains(&TransportCall::FetchLogs(path)));
        assert!(screen(&mut app).contains("error: tests failed"));
    }

    #[tokio::test]
    async fn test_toggle_collapses_selected_step() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut app = app(transport);
        app.apply_execution(&execution(
            ExecutionStatus::Failure,
            vec![step(1, "lint", ExecutionStatus::Failure)],
        ));
        assert!(app.views()[0].is_expanded());

        app.handle_key_action(event_handler::key_action(KeyEvent::from(KeyCode::Enter)));

        assert!(!app.views()[0].is_expanded());
        assert!(screen(&mut app).contains("Collapsed"));
    }

    #[tokio::test]
    async fn test_restarted_step_gets_fresh_view() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut app = app(transport.clone());
        let mut lint = step(1, "lint", ExecutionStatus::Failure);
        lint.started = 1_000;
        app.apply_execution(&execution(ExecutionStatus::Failure, vec![lint.clone()]));

        app.handle_key_action(KeyAction::ToggleStep);
        assert!(!app.views()[0].is_expanded());

        // Same run: the user's collapse sticks
        app.apply_execution(&execution(ExecutionStatus::Failure, vec![lint.clone()]));
        assert!(!app.views()[0].is_expanded());

        // Restarted run: rebuilt from its status
        lint.started = 9_000;
        app.apply_execution(&execution(ExecutionStatus::Failure, vec![lint]));
        assert!(app.views()[0].is_expanded());
        tokio::task::yield_now().await;
        assert_eq!(
            transport
                .calls()
                .iter()
                .filter(|call| matches!(call, TransportCall::FetchLogs(_)))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_selection_stays_in_bounds() {
        let mut app = app(Arc::new(ScriptedTransport::new()));
        app.apply_execution(&execution(
            ExecutionStatus::Success,
            vec![
                step(1, "a", ExecutionStatus::Success),
                step(2, "b", ExecutionStatus::Success),
            ],
        ));

        app.handle_key_action(KeyAction::SelectNext);
        app.handle_key_action(KeyAction::SelectNext);
        assert_eq!(app.selected_index, 1);

        app.handle_key_action(KeyAction::SelectPrevious);
        app.handle_key_action(KeyAction::SelectPrevious);
        assert_eq!(app.selected_index, 0);
    }

    #[tokio::test]
    async fn test_refresh_error_shows_notification() {
        let mut app = app(Arc::new(ScriptedTransport::new()));

        app.handle_signal(WorkerSignal::Execution(Err(
            sl_core::transport::TransportError::Request("connection refused".to_string()),
        )));

        assert!(screen(&mut app).contains("connection refused"));
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = app(Arc::new(ScriptedTransport::new()));
        assert!(!app.should_exit);

        app.handle_key_action(event_handler::key_action(KeyEvent::from(KeyCode::Char('q'))));

        assert!(app.should_exit);
    }
}
