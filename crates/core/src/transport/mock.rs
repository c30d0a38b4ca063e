//! In-memory transport for tests and offline demos.
//!
//! Live streams are backed by channels the caller keeps the sending half of,
//! so a test decides exactly when each event arrives.

use crate::transport::LogTransport;
use crate::transport::StreamEvent;
use crate::transport::StreamEvents;
use crate::transport::TransportError;
use async_trait::async_trait;
use sl_protocol::Execution;
use sl_protocol::ExecutionRef;
use sl_protocol::LiveLogLine;
use sl_protocol::StepLogPath;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::MutexGuard;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A request the transport has served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    FetchLogs(StepLogPath),
    OpenStream(StepLogPath),
    FetchExecution(ExecutionRef),
}

#[derive(Default)]
struct Script {
    logs: HashMap<StepLogPath, Result<Vec<LiveLogLine>, TransportError>>,
    streams: HashMap<StepLogPath, VecDeque<mpsc::UnboundedReceiver<StreamEvent>>>,
    executions: VecDeque<Result<Execution, TransportError>>,
    calls: Vec<TransportCall>,
}

/// Transport replaying scripted responses.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // A panicking test thread must not hide the script from the others.
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `result` for every historical fetch of `path`.
    pub fn set_logs(&self, path: &StepLogPath, result: Result<Vec<LiveLogLine>, TransportError>) {
        self.script().logs.insert(path.clone(), result);
    }

    /// Queue a live stream for the next connection to `path`.
    ///
    /// Events sent on the returned channel are delivered in order. Dropping
    /// the sender ends the stream.
    pub fn push_stream(&self, path: &StepLogPath) -> mpsc::UnboundedSender<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script()
            .streams
            .entry(path.clone())
            .or_default()
            .push_back(rx);
        tx
    }

    /// Queue a response for the next execution fetch.
    pub fn push_execution(&self, result: Result<Execution, TransportError>) {
        self.script().executions.push_back(result);
    }

    /// Requests served so far, oldest first.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.script().calls.clone()
    }
}

#[async_trait]
impl LogTransport for ScriptedTransport {
    async fn fetch_logs(&self, path: &StepLogPath) -> Result<Vec<LiveLogLine>, TransportError> {
        let mut script = self.script();
        script.calls.push(TransportCall::FetchLogs(path.clone()));
        script
            .logs
            .get(path)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn open_stream(&self, path: &StepLogPath) -> Result<StreamEvents, TransportError> {
        let mut script = self.script();
        script.calls.push(TransportCall::OpenStream(path.clone()));
        let rx = script
            .streams
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| TransportError::Status {
                status: 404,
                body: format!("no stream scripted for {path}"),
            })?;
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn fetch_execution(&self, execution: &ExecutionRef) -> Result<Execution, TransportError> {
        let mut script = self.script();
        script.calls.push(TransportCall::FetchExecution(execution.clone()));
        script.executions.pop_front().unwrap_or_else(|| {
            Err(TransportError::Request(
                "no execution scripted".to_string(),
            ))
        })
    }
}
