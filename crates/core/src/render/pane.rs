//! The log body of one step: a surface plus the batcher feeding it.

use crate::render::batch::BatchScheduler;
use crate::render::batch::LogSurface;
use crate::render::batch::RedrawScheduler;
use crate::render::sanitize::SanitizedLine;

/// Owns the two paths that may write to a step's surface.
///
/// Live lines go through the batcher and reach the surface on the next
/// flush; historical lines are appended directly in a single call.
#[derive(Debug)]
pub struct LogPane<S, R> {
    surface: S,
    batch: BatchScheduler<R>,
}

impl<S: LogSurface, R: RedrawScheduler> LogPane<S, R> {
    pub fn new(surface: S, redraw: R) -> Self {
        Self {
            surface,
            batch: BatchScheduler::new(redraw),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Queue a streamed line for the next flush.
    pub fn push_live(&mut self, line: SanitizedLine) {
        self.batch.push(line);
    }

    /// Append a complete historical log at once, bypassing the batcher.
    pub fn append_history(&mut self, lines: Vec<SanitizedLine>) {
        if !lines.is_empty() {
            self.surface.append_lines(lines);
        }
    }

    /// Flush queued live lines; call once per redraw.
    pub fn flush(&mut self) -> usize {
        self.batch.flush(&mut self.surface)
    }

    /// Empty the surface and forget queued lines.
    pub fn clear(&mut self) {
        self.batch.discard();
        self.surface.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.batch.pending_len()
    }
}
