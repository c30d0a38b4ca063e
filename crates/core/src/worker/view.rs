//! A step's controller wired to its log pane and the worker.

use crate::controller::StepViewController;
use crate::controller::ViewEffects;
use crate::render::batch::LogSurface;
use crate::render::batch::RedrawScheduler;
use crate::render::pane::LogPane;
use crate::session::Connection;
use crate::session::SessionState;
use crate::transport::StreamEvent;
use crate::worker::LogWorker;
use crate::worker::WorkerSignal;
use sl_protocol::ExecutionStatus;
use sl_protocol::Notification;
use sl_protocol::StepLogPath;

/// Everything needed to display one step's log.
#[derive(Debug)]
pub struct StepView<S, R> {
    controller: StepViewController,
    pane: LogPane<S, R>,
}

struct PaneEffects<'a, S, R> {
    pane: &'a mut LogPane<S, R>,
    worker: &'a LogWorker,
}

impl<S: LogSurface, R: RedrawScheduler> ViewEffects for PaneEffects<'_, S, R> {
    fn open_stream(&mut self, path: &StepLogPath, generation: u64) -> Box<dyn Connection> {
        Box::new(self.worker.spawn_stream(path.clone(), generation))
    }

    fn start_fetch(&mut self, path: &StepLogPath, generation: u64) {
        self.worker.spawn_fetch(path.clone(), generation);
    }

    fn clear_surface(&mut self) {
        self.pane.clear();
    }

    fn notify(&mut self, notification: Notification) {
        self.worker.notify(notification);
    }
}

impl<S: LogSurface, R: RedrawScheduler> StepView<S, R> {
    pub fn new(controller: StepViewController, pane: LogPane<S, R>) -> Self {
        Self { controller, pane }
    }

    pub fn controller(&self) -> &StepViewController {
        &self.controller
    }

    pub fn pane(&self) -> &LogPane<S, R> {
        &self.pane
    }

    pub fn pane_mut(&mut self) -> &mut LogPane<S, R> {
        &mut self.pane
    }

    pub fn path(&self) -> &StepLogPath {
        self.controller.path()
    }

    pub fn is_expanded(&self) -> bool {
        self.controller.is_expanded()
    }

    pub fn is_streaming(&self) -> bool {
        self.controller.session_state() == SessionState::Open
    }

    pub fn start(&mut self, worker: &LogWorker) {
        let mut fx = PaneEffects {
            pane: &mut self.pane,
            worker,
        };
        self.controller.start(&mut fx);
    }

    pub fn toggle(&mut self, worker: &LogWorker) {
        let mut fx = PaneEffects {
            pane: &mut self.pane,
            worker,
        };
        self.controller.toggle(&mut fx);
    }

    pub fn set_status(&mut self, status: ExecutionStatus, worker: &LogWorker) {
        let mut fx = PaneEffects {
            pane: &mut self.pane,
            worker,
        };
        self.controller.set_status(status, &mut fx);
    }

    /// Apply a signal addressed to this step. Returns false when the signal
    /// belongs to another step and was left alone.
    pub fn handle_signal(&mut self, signal: &WorkerSignal, worker: &LogWorker) -> bool {
        let mut fx = PaneEffects {
            pane: &mut self.pane,
            worker,
        };

        match signal {
            WorkerSignal::Stream {
                path,
                generation,
                event,
            } if path == self.controller.path() => {
                match event {
                    StreamEvent::Message(data) => {
                        if let Some(line) =
                            self.controller.on_stream_message(*generation, data, &mut fx)
                        {
                            fx.pane.push_live(line);
                        }
                    }
                    StreamEvent::Terminal(data) => {
                        self.controller
                            .on_stream_terminal(*generation, data.as_deref(), &mut fx);
                    }
                }
                true
            }
            WorkerSignal::Logs {
                path,
                generation,
                result,
            } if path == self.controller.path() => {
                if let Some(lines) =
                    self.controller
                        .on_fetch_result(*generation, result.clone(), &mut fx)
                {
                    fx.pane.append_history(lines);
                }
                true
            }
            _ => false,
        }
    }

    /// Commit queued live lines; call once per redraw.
    pub fn flush(&mut self) -> usize {
        self.pane.flush()
    }

    pub fn shutdown(&mut self) {
        self.controller.shutdown();
        self.pane.clear();
    }
}
