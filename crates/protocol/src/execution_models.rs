//! Pipeline execution models as reported by the backend.
//!
//! An execution is made of ordered stages, each of which is made of ordered
//! steps. These records are read-only to steplog: the backend pipeline engine
//! creates and updates them, and the client only polls for fresh copies.

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Execution state of a step, stage or whole execution.
///
/// Serialized in lowercase to match the backend's wire format.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Queued, not started yet.
    #[default]
    Pending,
    /// Currently executing; logs are produced live.
    Running,
    /// Finished with exit code zero.
    Success,
    /// Finished with a non-zero exit code.
    Failure,
    /// Could not be executed because of an infrastructure error.
    Error,
    /// Not executed because of a condition or an earlier failure.
    Skipped,
}

impl ExecutionStatus {
    /// Whether logs for this status are still being produced.
    pub fn is_running(self) -> bool {
        self == ExecutionStatus::Running
    }

    /// Whether this status has a complete, fetchable log.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Failure | ExecutionStatus::Error
        )
    }

    /// Whether a step in this status should start out expanded.
    pub fn expands_initially(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Running | ExecutionStatus::Error | ExecutionStatus::Failure
        )
    }

    /// Lowercase name as used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failure => "failure",
            ExecutionStatus::Error => "error",
            ExecutionStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a pipeline stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Step {
    /// Ordinal number of the step within its stage, starting at 1.
    #[ts(type = "number")]
    pub number: i64,

    /// Display name.
    pub name: String,

    /// Current execution status.
    #[serde(default)]
    pub status: ExecutionStatus,

    /// Start time in unix milliseconds, 0 when not started.
    #[serde(default)]
    #[ts(type = "number")]
    pub started: i64,

    /// Stop time in unix milliseconds, 0 when not stopped.
    #[serde(default)]
    #[ts(type = "number")]
    pub stopped: i64,

    /// Process exit code once stopped.
    #[serde(default)]
    #[ts(type = "number")]
    pub exit_code: i64,

    /// Error reported by the runner, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Step {
    /// Start time, if the step has started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.started)
    }

    /// Stop time, if the step has stopped.
    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.stopped)
    }

    /// Wall-clock duration, available only once both timestamps are set.
    pub fn duration(&self) -> Option<Duration> {
        let started = self.started_at()?;
        let stopped = self.stopped_at()?;
        Some(stopped.signed_duration_since(started).max(Duration::zero()))
    }
}

fn timestamp(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

/// One stage of an execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Stage {
    /// Ordinal number of the stage within its execution, starting at 1.
    #[ts(type = "number")]
    pub number: i64,

    /// Display name.
    pub name: String,

    /// Aggregated status of the stage.
    #[serde(default)]
    pub status: ExecutionStatus,

    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A pipeline execution with its stages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Execution {
    /// Execution number within its pipeline.
    #[ts(type = "number")]
    pub number: i64,

    /// Aggregated status of the execution.
    #[serde(default)]
    pub status: ExecutionStatus,

    /// Stages in execution order.
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Execution {
    /// Find a stage by its number.
    pub fn stage(&self, number: i64) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.number == number)
    }
}
