//! Background I/O for step views.
//!
//! The [`LogWorker`] owns the transport and runs every network operation in
//! its own tokio task. Results come back as [`WorkerSignal`]s on a single
//! channel, tagged with the step and generation they were started for, so
//! the owner of the views applies them in one place and drops stale ones.

pub mod view;

use crate::transport::LogTransport;
use crate::transport::StreamEvent;
use crate::transport::TransportError;
use sl_protocol::Execution;
use sl_protocol::ExecutionRef;
use sl_protocol::LiveLogLine;
use sl_protocol::Notification;
use sl_protocol::StepLogPath;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::StreamExt;
use tracing::debug;
use tracing::warn;

pub use view::StepView;

/// Result of background work, delivered to whoever owns the step views.
#[derive(Debug, Clone)]
pub enum WorkerSignal {
    /// An event on a live stream.
    Stream {
        path: StepLogPath,
        generation: u64,
        event: StreamEvent,
    },
    /// A historical fetch finished.
    Logs {
        path: StepLogPath,
        generation: u64,
        result: Result<Vec<LiveLogLine>, TransportError>,
    },
    /// A fresh copy of the execution being watched.
    Execution(Result<Execution, TransportError>),
    /// Something to show the user.
    Notify(Notification),
}

/// Spawns transport work and forwards the results.
#[derive(Clone)]
pub struct LogWorker {
    transport: Arc<dyn LogTransport>,
    signals_tx: mpsc::UnboundedSender<WorkerSignal>,
}

impl LogWorker {
    /// Create a worker and the receiving end of its signal channel.
    pub fn new(transport: Arc<dyn LogTransport>) -> (Self, mpsc::UnboundedReceiver<WorkerSignal>) {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        (
            Self {
                transport,
                signals_tx,
            },
            signals_rx,
        )
    }

    pub fn transport(&self) -> &Arc<dyn LogTransport> {
        &self.transport
    }

    /// Connect to a live stream and forward its events.
    ///
    /// The stream always ends with exactly one terminal event: failing to
    /// connect, or the stream running dry without one, is reported as an
    /// unexpected end. Aborting the returned handle stops delivery.
    pub fn spawn_stream(&self, path: StepLogPath, generation: u64) -> AbortHandle {
        let transport = Arc::clone(&self.transport);
        let signals_tx = self.signals_tx.clone();

        let handle = tokio::spawn(async move {
            let send = |event: StreamEvent| {
                signals_tx
                    .send(WorkerSignal::Stream {
                        path: path.clone(),
                        generation,
                        event,
                    })
                    .is_ok()
            };

            let mut events = match transport.open_stream(&path).await {
                Ok(events) => events,
                Err(err) => {
                    warn!(step = %path, error = %err, "failed to open log stream");
                    send(StreamEvent::Terminal(None));
                    return;
                }
            };
            debug!(step = %path, generation, "log stream connected");

            while let Some(event) = events.next().await {
                let terminal = matches!(event, StreamEvent::Terminal(_));
                if !send(event) || terminal {
                    return;
                }
            }

            send(StreamEvent::Terminal(None));
        });

        handle.abort_handle()
    }

    /// Fetch a step's full log in the background.
    pub fn spawn_fetch(&self, path: StepLogPath, generation: u64) {
        let transport = Arc::clone(&self.transport);
        let signals_tx = self.signals_tx.clone();

        tokio::spawn(async move {
            let result = transport.fetch_logs(&path).await;
            // The receiver is gone when the app is shutting down.
            let _ = signals_tx.send(WorkerSignal::Logs {
                path,
                generation,
                result,
            });
        });
    }

    /// Refresh the execution record in the background.
    pub fn spawn_execution_fetch(&self, execution: ExecutionRef) {
        let transport = Arc::clone(&self.transport);
        let signals_tx = self.signals_tx.clone();

        tokio::spawn(async move {
            let result = transport.fetch_execution(&execution).await;
            let _ = signals_tx.send(WorkerSignal::Execution(result));
        });
    }

    /// Forward a notification through the signal channel.
    pub fn notify(&self, notification: Notification) {
        let _ = self.signals_tx.send(WorkerSignal::Notify(notification));
    }
}
