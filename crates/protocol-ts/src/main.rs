//! Writes TypeScript bindings for every `sl-protocol` type.
//!
//! Usage: `sl-protocol-ts [OUT_DIR]` (defaults to `./bindings`).

use anyhow::Context;
use anyhow::Result;
use sl_protocol::Execution;
use sl_protocol::GlobalConfig;
use sl_protocol::LiveLogLine;
use sl_protocol::Notification;
use sl_protocol::StepLogPath;
use std::path::PathBuf;
use ts_rs::TS;

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bindings"));

    // Dependencies (Stage, Step, ExecutionStatus, ...) are exported transitively.
    Execution::export_all_to(&out_dir).context("exporting Execution")?;
    LiveLogLine::export_all_to(&out_dir).context("exporting LiveLogLine")?;
    StepLogPath::export_all_to(&out_dir).context("exporting StepLogPath")?;
    Notification::export_all_to(&out_dir).context("exporting Notification")?;
    GlobalConfig::export_all_to(&out_dir).context("exporting GlobalConfig")?;

    println!("TypeScript bindings written to {}", out_dir.display());
    Ok(())
}
