//! Access to the backend log endpoints.
//!
//! The [`LogTransport`] trait is the seam between the log pipeline and the
//! network. [`http::HttpTransport`] talks to a real server;
//! [`mock::ScriptedTransport`] replays canned responses for tests.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use sl_protocol::Execution;
use sl_protocol::ExecutionRef;
use sl_protocol::LiveLogLine;
use sl_protocol::StepLogPath;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

pub use http::HttpTransport;
pub use mock::ScriptedTransport;
pub use mock::TransportCall;

/// One event received on a live log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A regular event; the payload is a JSON [`LiveLogLine`].
    Message(String),
    /// The stream is over. The payload is present when the server sent an
    /// explicit terminal event, absent when the connection dropped or ended.
    Terminal(Option<String>),
}

/// Errors talking to the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Live events of one step, in arrival order. A stream always ends with a
/// single [`StreamEvent::Terminal`].
pub type StreamEvents = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Every line produced so far by a step.
    async fn fetch_logs(&self, path: &StepLogPath) -> Result<Vec<LiveLogLine>, TransportError>;

    /// Connect to a step's live stream.
    async fn open_stream(&self, path: &StepLogPath) -> Result<StreamEvents, TransportError>;

    /// Current state of an execution, including its stages and steps.
    async fn fetch_execution(&self, execution: &ExecutionRef) -> Result<Execution, TransportError>;
}
