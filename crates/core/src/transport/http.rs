//! HTTP transport using reqwest and server-sent events.

use crate::transport::LogTransport;
use crate::transport::StreamEvent;
use crate::transport::StreamEvents;
use crate::transport::TransportError;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use serde::de::DeserializeOwned;
use sl_protocol::Execution;
use sl_protocol::ExecutionRef;
use sl_protocol::GlobalConfig;
use sl_protocol::LiveLogLine;
use sl_protocol::StepLogPath;
use tokio_stream::StreamExt;
use tracing::debug;

/// SSE event name the server uses for its terminal event.
const TERMINAL_EVENT: &str = "error";

/// Talks to the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.server.clone(), config.token.clone())
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.get(url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        debug!(path, "GET");
        let response = self.send(self.get(path)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LogTransport for HttpTransport {
    async fn fetch_logs(&self, path: &StepLogPath) -> Result<Vec<LiveLogLine>, TransportError> {
        self.get_json(&path.logs_path()).await
    }

    async fn open_stream(&self, path: &StepLogPath) -> Result<StreamEvents, TransportError> {
        let stream_path = path.stream_path();
        debug!(path = %stream_path, "GET (stream)");

        let response = self
            .send(
                self.get(&stream_path)
                    .header(reqwest::header::ACCEPT, "text/event-stream"),
            )
            .await?;

        let mut events = Box::pin(response.bytes_stream().eventsource());

        let stream = async_stream::stream! {
            loop {
                match events.next().await {
                    Some(Ok(event)) if event.event == TERMINAL_EVENT => {
                        yield StreamEvent::Terminal(Some(event.data));
                        break;
                    }
                    Some(Ok(event)) => {
                        yield StreamEvent::Message(event.data);
                    }
                    Some(Err(err)) => {
                        debug!(error = %err, "log stream transport error");
                        yield StreamEvent::Terminal(None);
                        break;
                    }
                    None => {
                        yield StreamEvent::Terminal(None);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn fetch_execution(&self, execution: &ExecutionRef) -> Result<Execution, TransportError> {
        self.get_json(&execution.execution_path()).await
    }
}
