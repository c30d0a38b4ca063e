//! Log line records and the endpoints that serve them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Payload of the terminal stream event that marks a normal end of stream.
pub const EOF_SENTINEL: &str = "eof";

/// One line of step output.
///
/// Both the historical endpoint (as a JSON array) and the live stream (one
/// object per event) use this shape. Every field is optional on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
pub struct LiveLogLine {
    /// Position of the line within the step's output.
    #[serde(default)]
    #[ts(type = "number")]
    pub pos: i64,

    /// Raw line text, possibly with ANSI escapes and a trailing newline.
    #[serde(default)]
    pub out: String,

    /// Seconds elapsed since the step started.
    #[serde(default)]
    #[ts(type = "number")]
    pub time: i64,
}

/// Identifies one pipeline execution of a repository.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, TS)]
pub struct ExecutionRef {
    /// Repository path, e.g. `space/repo`.
    pub repo_path: String,
    /// Pipeline identifier.
    pub pipeline: String,
    /// Execution number.
    #[ts(type = "number")]
    pub execution: i64,
}

impl ExecutionRef {
    pub fn new(repo_path: impl Into<String>, pipeline: impl Into<String>, execution: i64) -> Self {
        Self {
            repo_path: repo_path.into(),
            pipeline: pipeline.into(),
            execution,
        }
    }

    /// API path of the execution resource.
    pub fn execution_path(&self) -> String {
        format!(
            "/api/v1/repos/{}/+/pipelines/{}/executions/{}",
            self.repo_path.trim_matches('/'),
            self.pipeline,
            self.execution
        )
    }

    /// Log path of one step of this execution.
    pub fn step(&self, stage: i64, step: i64) -> StepLogPath {
        StepLogPath {
            execution: self.clone(),
            stage,
            step,
        }
    }
}

/// Identifies the logs of one step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, TS)]
pub struct StepLogPath {
    pub execution: ExecutionRef,
    #[ts(type = "number")]
    pub stage: i64,
    #[ts(type = "number")]
    pub step: i64,
}

impl StepLogPath {
    /// Request/response endpoint returning every line produced so far.
    pub fn logs_path(&self) -> String {
        format!(
            "{}/logs/{}/{}",
            self.execution.execution_path(),
            self.stage,
            self.step
        )
    }

    /// Server-push endpoint streaming lines as they are produced.
    pub fn stream_path(&self) -> String {
        format!("{}/stream", self.logs_path())
    }
}

impl std::fmt::Display for StepLogPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{} stage {} step {}",
            self.execution.pipeline, self.execution.execution, self.stage, self.step
        )
    }
}
