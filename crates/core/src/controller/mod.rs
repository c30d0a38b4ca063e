//! Per-step view controller.
//!
//! The [`StepViewController`] decides, from a step's status and whether its
//! view is expanded, which log source is active:
//!
//! - expanded and running: a live [`StreamSession`], historical fetch lazy
//! - expanded and finished (success, failure, error): one historical fetch
//! - collapsed, pending or skipped: nothing
//!
//! It never performs I/O itself. Every side effect goes through the
//! [`ViewEffects`] passed into each call, in the order the controller
//! issues them, which is what keeps "close the old session" strictly ahead
//! of "open the next one".

use crate::render::sanitize::sanitize_line;
use crate::render::sanitize::SanitizedLine;
use crate::session::Connection;
use crate::session::MessageOutcome;
use crate::session::SessionState;
use crate::session::StreamSession;
use crate::session::TerminalOutcome;
use crate::transport::TransportError;
use sl_protocol::ExecutionStatus;
use sl_protocol::LiveLogLine;
use sl_protocol::Notification;
use sl_protocol::StepLogPath;
use tracing::debug;
use tracing::warn;

/// Side effects requested by the controller.
pub trait ViewEffects {
    /// Connect to the step's live stream. Events must be tagged `generation`.
    fn open_stream(&mut self, path: &StepLogPath, generation: u64) -> Box<dyn Connection>;

    /// Start a historical fetch whose result must be tagged `generation`.
    fn start_fetch(&mut self, path: &StepLogPath, generation: u64);

    /// Empty the step's log surface.
    fn clear_surface(&mut self);

    /// Show a transient message to the user.
    fn notify(&mut self, notification: Notification);
}

/// Progress of the historical fetch for the current expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Not requested.
    Lazy,
    /// Requested, waiting for the result tagged with this generation.
    InFlight(u64),
    /// Result rendered.
    Loaded,
    /// Request failed; not retried until the view is expanded again.
    Failed,
}

/// View state of one pipeline step.
#[derive(Debug)]
pub struct StepViewController {
    path: StepLogPath,
    status: ExecutionStatus,
    expanded: bool,
    auto_collapse: bool,
    fetch: FetchState,
    fetch_generation: u64,
    session: StreamSession,
}

impl StepViewController {
    /// Create the controller. Running, failed and errored steps start
    /// expanded. Nothing happens until [`StepViewController::start`].
    pub fn new(path: StepLogPath, status: ExecutionStatus) -> Self {
        Self {
            path,
            status,
            expanded: status.expands_initially(),
            auto_collapse: false,
            fetch: FetchState::Lazy,
            fetch_generation: 0,
            session: StreamSession::new(),
        }
    }

    /// Override the initial expansion.
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn path(&self) -> &StepLogPath {
        &self.path
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetch
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.fetch, FetchState::InFlight(_))
    }

    /// Whether a finished live stream will collapse the view once the step
    /// reports success.
    pub fn auto_collapse_pending(&self) -> bool {
        self.auto_collapse
    }

    /// Apply the initial state.
    pub fn start(&mut self, fx: &mut dyn ViewEffects) {
        self.reconcile(fx);
    }

    /// Flip expansion. Always allowed, whatever the status.
    pub fn toggle(&mut self, fx: &mut dyn ViewEffects) {
        self.expanded = !self.expanded;
        // An explicit choice by the user overrides a pending auto-collapse.
        self.auto_collapse = false;
        self.reconcile(fx);
    }

    /// Record a fresh status from the backend.
    pub fn set_status(&mut self, status: ExecutionStatus, fx: &mut dyn ViewEffects) {
        if status != self.status {
            debug!(step = %self.path, from = %self.status, to = %status, "step status changed");
            self.status = status;
        }
        self.reconcile(fx);
    }

    /// Handle a live message. Returns the line to queue for rendering.
    pub fn on_stream_message(
        &mut self,
        generation: u64,
        data: &str,
        fx: &mut dyn ViewEffects,
    ) -> Option<SanitizedLine> {
        match self.session.on_message(generation, data) {
            MessageOutcome::Line(line) => Some(line),
            MessageOutcome::Malformed(err) => {
                fx.notify(Notification::error(err.to_string()));
                None
            }
            MessageOutcome::Ignored => None,
        }
    }

    /// Handle the end of a live stream.
    pub fn on_stream_terminal(
        &mut self,
        generation: u64,
        data: Option<&str>,
        fx: &mut dyn ViewEffects,
    ) {
        if let TerminalOutcome::Finished { .. } = self.session.on_terminal(generation, data) {
            self.auto_collapse = true;
            self.reconcile(fx);
        }
    }

    /// Handle a historical fetch result. Returns the lines to append, in
    /// order, when the result is still wanted.
    pub fn on_fetch_result(
        &mut self,
        generation: u64,
        result: Result<Vec<LiveLogLine>, TransportError>,
        fx: &mut dyn ViewEffects,
    ) -> Option<Vec<SanitizedLine>> {
        if self.fetch != FetchState::InFlight(generation) {
            debug!(step = %self.path, generation, "dropping stale log fetch result");
            return None;
        }

        match result {
            Ok(lines) => {
                self.fetch = FetchState::Loaded;
                Some(lines.iter().map(|line| sanitize_line(&line.out)).collect())
            }
            Err(err) => {
                warn!(step = %self.path, error = %err, "log fetch failed");
                self.fetch = FetchState::Failed;
                fx.notify(Notification::error(err.to_string()));
                None
            }
        }
    }

    /// Release everything; used when the view goes away.
    pub fn shutdown(&mut self) {
        self.session.close();
        self.fetch = FetchState::Lazy;
    }

    fn reconcile(&mut self, fx: &mut dyn ViewEffects) {
        if self.auto_collapse && self.expanded && self.status == ExecutionStatus::Success {
            debug!(step = %self.path, "auto-collapsing successful step");
            self.auto_collapse = false;
            self.expanded = false;
        }

        if self.expanded && self.status.is_running() {
            // A finished session stays closed until expansion or status change.
            if self.session.state() == SessionState::Idle {
                self.fetch = FetchState::Lazy;
                self.auto_collapse = false;
                fx.clear_surface();
                let path = self.path.clone();
                let generation = self
                    .session
                    .open_with(|generation| fx.open_stream(&path, generation));
                debug!(step = %self.path, generation, "opened live log session");
            }
        } else if self.session.close() {
            debug!(step = %self.path, "closed live log session");
        }

        if !self.expanded {
            self.fetch = FetchState::Lazy;
            return;
        }

        if self.status.is_terminal() && self.fetch == FetchState::Lazy && !self.session.is_open() {
            self.fetch_generation += 1;
            self.fetch = FetchState::InFlight(self.fetch_generation);
            fx.clear_surface();
            fx.start_fetch(&self.path, self.fetch_generation);
        }
    }
}
