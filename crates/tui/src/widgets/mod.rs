//! TUI widgets.

pub mod log_viewport;
pub mod status_line;
pub mod step_list;

pub use log_viewport::LogViewport;
pub use status_line::StatusLine;
pub use step_list::render_step_list;
pub use step_list::StepRow;
