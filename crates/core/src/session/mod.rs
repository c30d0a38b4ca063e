//! Live log stream session state machine.
//!
//! A [`StreamSession`] tracks one server-push connection for one step. The
//! transition functions are plain methods taking already-received event
//! payloads, so the machine runs the same with a real network reader or a
//! test feeding it by hand. The only thing it knows about the transport is a
//! [`Connection`] handle to close.
//!
//! ```text
//! Idle --open--> Open --message--> Open
//!                Open --malformed--> Closed
//!                Open --terminal--> Closed (finished)
//! Open/Closed --close--> Idle
//! ```

use crate::render::sanitize::sanitize_line;
use crate::render::sanitize::SanitizedLine;
use sl_protocol::LiveLogLine;
use sl_protocol::EOF_SENTINEL;
use thiserror::Error;

/// Handle to an underlying live connection.
pub trait Connection: Send {
    /// Stop delivering events and release the connection.
    fn close(&mut self);
}

impl Connection for tokio::task::AbortHandle {
    fn close(&mut self) {
        self.abort();
    }
}

/// Lifecycle state of a [`StreamSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    Idle,
    /// Connected and accepting messages.
    Open,
    /// The stream ended or failed; waiting to be torn down.
    Closed,
}

/// Errors raised while handling stream payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Malformed log stream payload: {0}")]
    MalformedPayload(String),
}

/// Result of feeding a message event to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// A sanitized line for the batching scheduler.
    Line(SanitizedLine),
    /// The payload could not be parsed; the session is now closed.
    Malformed(SessionError),
    /// The event belongs to an older connection or the session is not open.
    Ignored,
}

/// Result of feeding a terminal event to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// The stream is finished. `expected` is true for the `eof` sentinel.
    Finished { expected: bool },
    Ignored,
}

/// One live log connection for a single step.
pub struct StreamSession {
    state: SessionState,
    generation: u64,
    connection: Option<Box<dyn Connection>>,
    finished: bool,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("connected", &self.connection.is_some())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            connection: None,
            finished: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Whether the stream ended through a terminal event.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Generation of the current (or most recent) connection.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Open a new connection, closing any previous one first.
    ///
    /// `connect` receives the generation events of the new connection must
    /// carry; events tagged with any other generation are ignored.
    pub fn open_with<F>(&mut self, connect: F) -> u64
    where
        F: FnOnce(u64) -> Box<dyn Connection>,
    {
        self.close();
        self.generation += 1;
        self.connection = Some(connect(self.generation));
        self.state = SessionState::Open;
        self.finished = false;
        self.generation
    }

    /// Handle a message event carrying a JSON [`LiveLogLine`].
    pub fn on_message(&mut self, generation: u64, data: &str) -> MessageOutcome {
        if !self.accepts(generation) {
            return MessageOutcome::Ignored;
        }

        match serde_json::from_str::<LiveLogLine>(data) {
            Ok(line) => MessageOutcome::Line(sanitize_line(&line.out)),
            Err(err) => {
                tracing::warn!(generation, error = %err, "closing log stream after malformed payload");
                self.release();
                self.state = SessionState::Closed;
                MessageOutcome::Malformed(SessionError::MalformedPayload(err.to_string()))
            }
        }
    }

    /// Handle the transport signalling the end of the stream.
    ///
    /// A payload of exactly `eof` is the normal end of a step's output. Any
    /// other end is logged as an error for diagnosis; the UI is not affected.
    pub fn on_terminal(&mut self, generation: u64, data: Option<&str>) -> TerminalOutcome {
        if !self.accepts(generation) {
            return TerminalOutcome::Ignored;
        }

        let expected = data == Some(EOF_SENTINEL);
        if expected {
            tracing::debug!(generation, "log stream reached eof");
        } else {
            tracing::error!(generation, data = ?data, "log stream ended unexpectedly");
        }

        self.release();
        self.state = SessionState::Closed;
        self.finished = true;
        TerminalOutcome::Finished { expected }
    }

    /// Tear the session down. Closing an idle session does nothing.
    ///
    /// Returns whether there was anything to close.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Idle {
            return false;
        }
        self.release();
        self.state = SessionState::Idle;
        self.finished = false;
        true
    }

    fn accepts(&self, generation: u64) -> bool {
        self.state == SessionState::Open && generation == self.generation
    }

    fn release(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tracing_test::traced_test;

    struct CountingConnection {
        closes: Arc<AtomicUsize>,
    }

    impl Connection for CountingConnection {
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn open_session() -> (StreamSession, u64, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut session = StreamSession::new();
        let counter = Arc::clone(&closes);
        let generation = session.open_with(move |_| Box::new(CountingConnection { closes: counter }));
        (session, generation, closes)
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = StreamSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_finished());
    }

    #[test]
    fn test_message_yields_sanitized_line() {
        let (mut session, generation, _) = open_session();

        let outcome = session.on_message(generation, r#"{"out":"hello\n"}"#);

        match outcome {
            MessageOutcome::Line(line) => assert_eq!(line.plain_text(), "hello"),
            other => panic!("expected a line, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Open);
    }

    #[test]
    fn test_message_without_out_is_empty_line() {
        let (mut session, generation, _) = open_session();

        let outcome = session.on_message(generation, r#"{"pos":3}"#);

        assert!(matches!(outcome, MessageOutcome::Line(line) if line.is_empty()));
    }

    #[test]
    fn test_malformed_message_closes() {
        let (mut session, generation, closes) = open_session();

        let outcome = session.on_message(generation, "not json");

        assert!(matches!(
            outcome,
            MessageOutcome::Malformed(SessionError::MalformedPayload(_))
        ));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_finished());
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        // Nothing more is accepted once closed
        assert_eq!(
            session.on_message(generation, r#"{"out":"late"}"#),
            MessageOutcome::Ignored
        );
    }

    #[traced_test]
    #[test]
    fn test_eof_terminal_is_not_an_error() {
        let (mut session, generation, closes) = open_session();

        let outcome = session.on_terminal(generation, Some("eof"));

        assert_eq!(outcome, TerminalOutcome::Finished { expected: true });
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.is_finished());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(logs_contain("log stream reached eof"));
        assert!(!logs_contain("ended unexpectedly"));
        logs_assert(|lines: &[&str]| {
            if lines.iter().any(|line| line.contains("ERROR")) {
                Err("an eof terminal logged an error".to_string())
            } else {
                Ok(())
            }
        });
    }

    #[traced_test]
    #[test]
    fn test_unexpected_terminal_is_logged() {
        let (mut session, generation, _) = open_session();

        let outcome = session.on_terminal(generation, None);

        assert_eq!(outcome, TerminalOutcome::Finished { expected: false });
        assert!(session.is_finished());
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("ERROR") && line.contains("ended unexpectedly"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one error line, got {n}")),
            }
        });
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut session, _, closes) = open_session();

        assert!(session.close());
        let after_first = (session.state(), closes.load(Ordering::SeqCst));

        assert!(!session.close());
        let after_second = (session.state(), closes.load(Ordering::SeqCst));

        assert_eq!(after_first, (SessionState::Idle, 1));
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_close_after_terminal_does_not_close_connection_twice() {
        let (mut session, generation, closes) = open_session();

        session.on_terminal(generation, Some("eof"));
        session.close();
        session.close();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_from_previous_connection_are_ignored() {
        let (mut session, first, closes) = open_session();
        let second = session.open_with(|_| {
            Box::new(CountingConnection {
                closes: Arc::new(AtomicUsize::new(0)),
            })
        });

        assert_ne!(first, second);
        // Reopening closed the first connection before connecting again
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.on_message(first, r#"{"out":"stale"}"#),
            MessageOutcome::Ignored
        );
        assert_eq!(session.on_terminal(first, None), TerminalOutcome::Ignored);
        assert!(session.is_open());
    }

    #[test]
    fn test_drop_closes_connection() {
        let (session, _, closes) = open_session();
        drop(session);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
