//! Global configuration models for `.steplog/config.toml`.
//!
//! This module defines the structure of the configuration file that
//! controls which server steplog talks to and how often it refreshes.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Default server when none is configured.
pub const DEFAULT_SERVER: &str = "http://localhost:3000";

/// Default interval between execution status refreshes.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default redraw cadence, roughly one frame at 60Hz.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Represents global settings from `.steplog/config.toml`.
///
/// # Example
///
/// ```toml
/// # .steplog/config.toml
/// server = "https://ci.example.com"
/// token = "pat.xxxxx"
/// poll_interval_ms = 5000
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct GlobalConfig {
    /// Base URL of the code hosting server.
    #[serde(default = "default_server")]
    pub server: String,

    /// Bearer token sent with every request, if any.
    #[serde(default)]
    pub token: Option<String>,

    /// How often the execution is re-fetched to pick up step status changes.
    #[serde(default = "default_poll_interval_ms")]
    #[ts(type = "number")]
    pub poll_interval_ms: u64,

    /// Minimum spacing between two redraws of streamed log output.
    #[serde(default = "default_frame_interval_ms")]
    #[ts(type = "number")]
    pub frame_interval_ms: u64,

    /// Directory for the TUI log file. Falls back to the system temp dir.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            token: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            log_dir: None,
        }
    }
}
