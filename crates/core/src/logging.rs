//! Tracing subscriber setup shared by the binaries.
//!
//! The full-screen TUI writes its logs to a file so they never land on the
//! terminal it is drawing to; line-oriented commands log to stderr.

use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Name of the log file written by the TUI.
pub const LOG_FILE_NAME: &str = "steplog.log";

fn default_filter(debug: bool) -> &'static str {
    if debug {
        "sl_core=debug,sl_tui=debug,sl_cli=debug"
    } else {
        "sl_core=info,sl_tui=info,sl_cli=info"
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(debug)))
}

/// Where the TUI log file goes: `log_dir` when configured, the system temp
/// dir otherwise.
pub fn log_file_path(log_dir: Option<&str>) -> PathBuf {
    log_dir
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_FILE_NAME)
}

/// Build a subscriber appending to `path` through a non-blocking writer.
///
/// The returned guard flushes pending records when dropped.
pub fn file_subscriber(
    path: &Path,
    debug: bool,
) -> std::io::Result<(impl tracing::Subscriber + Send + Sync + 'static, WorkerGuard)> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = log_file_opts.open(path)?;
    let (writer, guard) = non_blocking(log_file);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter(debug));

    Ok((tracing_subscriber::registry().with(file_layer), guard))
}

/// Install [`file_subscriber`] as the global default.
///
/// Keep the returned guard alive for the lifetime of the program. Installing
/// twice is a no-op.
pub fn init_file_logging(path: &Path, debug: bool) -> std::io::Result<WorkerGuard> {
    let (subscriber, guard) = file_subscriber(path, debug)?;
    let _ = subscriber.try_init();
    Ok(guard)
}

/// Install a subscriber writing to stderr.
pub fn init_stderr_logging(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(debug))
        .try_init();
}
