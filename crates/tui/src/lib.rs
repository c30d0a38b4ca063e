//! # sl-tui
//!
//! Terminal UI for watching the step logs of a pipeline execution.
//!
//! The UI polls the execution for step statuses and shows each step's log
//! live while it runs, or in full once it has finished, using the pipeline
//! from `sl-core`.

pub mod app;
pub mod event_handler;
pub mod tui;
pub mod widgets;

pub use app::App;
pub use tui::Tui;

use anyhow::Result;
use sl_core::logging;
use sl_core::transport::HttpTransport;
use sl_core::worker::LogWorker;
use sl_protocol::ExecutionRef;
use sl_protocol::GlobalConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Watch `execution` until the user quits.
///
/// `stage` picks the stage to show; by default the running one is followed.
/// Logs go to a file since the terminal belongs to the UI.
pub async fn run_app(
    config: GlobalConfig,
    execution: ExecutionRef,
    stage: Option<i64>,
    debug: bool,
) -> Result<()> {
    let log_path = logging::log_file_path(config.log_dir.as_deref());
    let _log_guard = logging::init_file_logging(&log_path, debug)?;
    info!(server = %config.server, execution = %execution.execution_path(), "starting watch");

    let transport = Arc::new(HttpTransport::from_config(&config));
    let (worker, signals_rx) = LogWorker::new(transport);

    let mut tui = Tui::init(Duration::from_millis(config.frame_interval_ms))?;
    let mut app = App::new(
        execution,
        stage,
        worker,
        signals_rx,
        tui.frame_requester(),
        Duration::from_millis(config.poll_interval_ms),
    );

    let result = app.run(&mut tui).await;
    tui.restore()?;
    result
}
