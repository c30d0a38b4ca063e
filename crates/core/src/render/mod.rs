//! Turning raw log text into what ends up on screen.
//!
//! - [`sanitize`]: ANSI lines to safe styled markup
//! - [`batch`]: redraw-aligned coalescing of live lines
//! - [`pane`]: a step's surface together with its batcher

pub mod batch;
pub mod pane;
pub mod sanitize;

pub use batch::BatchScheduler;
pub use batch::LogSurface;
pub use batch::NotifyRedraw;
pub use batch::RedrawScheduler;
pub use pane::LogPane;
pub use sanitize::sanitize_line;
pub use sanitize::SanitizedLine;
