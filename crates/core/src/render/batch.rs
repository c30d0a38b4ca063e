//! Redraw-aligned batching of streamed log lines.
//!
//! Lines can arrive far faster than anything is worth redrawing. The
//! [`BatchScheduler`] buffers them and asks its [`RedrawScheduler`] for a
//! single redraw when the first line of a batch arrives; whoever owns the
//! redraw clock then calls [`BatchScheduler::flush`] once per frame, which
//! commits the whole batch to the [`LogSurface`] in one append.

use crate::render::sanitize::SanitizedLine;
use std::sync::Arc;
use tokio::sync::Notify;

/// An append-only text surface with a scroll position.
pub trait LogSurface {
    /// Append lines after the current content.
    fn append_lines(&mut self, lines: Vec<SanitizedLine>);

    /// Drop all content and reset the scroll position.
    fn clear(&mut self);

    /// Whether the view currently shows the last line.
    fn is_at_bottom(&self) -> bool;

    /// Move the view so the last line is visible.
    fn scroll_to_bottom(&mut self);
}

/// Something that can be asked to run a redraw soon.
pub trait RedrawScheduler {
    fn schedule_redraw(&self);
}

/// Redraw trigger for headless consumers: wakes a task waiting in
/// [`NotifyRedraw::requested`], which is expected to flush on its own timer.
#[derive(Clone, Debug, Default)]
pub struct NotifyRedraw {
    notify: Arc<Notify>,
}

impl NotifyRedraw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once a redraw has been requested since the last call.
    pub async fn requested(&self) {
        self.notify.notified().await;
    }
}

impl RedrawScheduler for NotifyRedraw {
    fn schedule_redraw(&self) {
        self.notify.notify_one();
    }
}

/// Coalesces lines between two flushes.
#[derive(Debug)]
pub struct BatchScheduler<R> {
    pending: Vec<SanitizedLine>,
    redraw: R,
}

impl<R: RedrawScheduler> BatchScheduler<R> {
    pub fn new(redraw: R) -> Self {
        Self {
            pending: Vec::new(),
            redraw,
        }
    }

    /// Buffer a line. Only the first line of a batch requests a redraw.
    pub fn push(&mut self, line: SanitizedLine) {
        if self.pending.is_empty() {
            self.redraw.schedule_redraw();
        }
        self.pending.push(line);
    }

    /// Number of lines waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop buffered lines without rendering them.
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Commit every buffered line to `surface`, in arrival order.
    ///
    /// A surface that showed its last line before the flush is scrolled to
    /// the new last line afterwards; any other scroll position is left alone.
    /// Returns the number of lines flushed.
    pub fn flush(&mut self, surface: &mut dyn LogSurface) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let follow = surface.is_at_bottom();
        let batch = std::mem::take(&mut self.pending);
        let count = batch.len();
        surface.append_lines(batch);

        if follow {
            surface.scroll_to_bottom();
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::sanitize::sanitize_line;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingRedraw {
        requests: Cell<usize>,
    }

    impl RedrawScheduler for &CountingRedraw {
        fn schedule_redraw(&self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    /// Surface with a fixed-height window over its lines.
    struct TestSurface {
        lines: Vec<String>,
        appends: usize,
        height: usize,
        offset: usize,
    }

    impl TestSurface {
        fn new(height: usize) -> Self {
            Self {
                lines: Vec::new(),
                appends: 0,
                height,
                offset: 0,
            }
        }

        fn max_offset(&self) -> usize {
            self.lines.len().saturating_sub(self.height)
        }
    }

    impl LogSurface for TestSurface {
        fn append_lines(&mut self, lines: Vec<SanitizedLine>) {
            self.appends += 1;
            self.lines.extend(lines.iter().map(SanitizedLine::plain_text));
        }

        fn clear(&mut self) {
            self.lines.clear();
            self.offset = 0;
        }

        fn is_at_bottom(&self) -> bool {
            self.offset >= self.max_offset()
        }

        fn scroll_to_bottom(&mut self) {
            self.offset = self.max_offset();
        }
    }

    fn lines(range: std::ops::Range<usize>) -> Vec<SanitizedLine> {
        range.map(|i| sanitize_line(&format!("line {i}\n"))).collect()
    }

    #[test]
    fn test_chunks_in_one_interval_flush_once_in_order() {
        let redraw = CountingRedraw::default();
        let mut batch = BatchScheduler::new(&redraw);
        let mut surface = TestSurface::new(10);

        for line in lines(0..50) {
            batch.push(line);
        }

        assert_eq!(redraw.requests.get(), 1);
        assert_eq!(batch.pending_len(), 50);

        assert_eq!(batch.flush(&mut surface), 50);
        assert_eq!(surface.appends, 1);
        assert_eq!(surface.lines.first().map(String::as_str), Some("line 0"));
        assert_eq!(surface.lines.last().map(String::as_str), Some("line 49"));
        assert!(surface
            .lines
            .iter()
            .enumerate()
            .all(|(i, line)| *line == format!("line {i}")));
    }

    #[test]
    fn test_each_batch_requests_one_redraw() {
        let redraw = CountingRedraw::default();
        let mut batch = BatchScheduler::new(&redraw);
        let mut surface = TestSurface::new(10);

        for line in lines(0..3) {
            batch.push(line);
        }
        batch.flush(&mut surface);
        for line in lines(3..6) {
            batch.push(line);
        }
        batch.flush(&mut surface);

        assert_eq!(redraw.requests.get(), 2);
        assert_eq!(surface.appends, 2);
        assert_eq!(surface.lines.len(), 6);
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let redraw = CountingRedraw::default();
        let mut batch = BatchScheduler::new(&redraw);
        let mut surface = TestSurface::new(10);

        assert_eq!(batch.flush(&mut surface), 0);
        assert_eq!(surface.appends, 0);
        assert_eq!(redraw.requests.get(), 0);
    }

    #[test]
    fn test_follows_output_when_pinned_to_bottom() {
        let redraw = CountingRedraw::default();
        let mut batch = BatchScheduler::new(&redraw);
        let mut surface = TestSurface::new(5);

        for line in lines(0..20) {
            batch.push(line);
        }
        batch.flush(&mut surface);

        assert!(surface.is_at_bottom());
        assert_eq!(surface.offset, 15);
    }

    #[test]
    fn test_preserves_scroll_position_when_scrolled_up() {
        let redraw = CountingRedraw::default();
        let mut batch = BatchScheduler::new(&redraw);
        let mut surface = TestSurface::new(5);

        for line in lines(0..20) {
            batch.push(line);
        }
        batch.flush(&mut surface);
        surface.offset = 3;

        for line in lines(20..30) {
            batch.push(line);
        }
        batch.flush(&mut surface);

        assert_eq!(surface.offset, 3);
        assert_eq!(surface.lines.len(), 30);
    }

    #[test]
    fn test_discard_drops_pending_lines() {
        let redraw = CountingRedraw::default();
        let mut batch = BatchScheduler::new(&redraw);
        let mut surface = TestSurface::new(5);

        for line in lines(0..4) {
            batch.push(line);
        }
        batch.discard();

        assert_eq!(batch.flush(&mut surface), 0);
        assert!(surface.lines.is_empty());
    }

    #[tokio::test]
    async fn test_notify_redraw_wakes_waiter() {
        let redraw = NotifyRedraw::new();
        let mut batch = BatchScheduler::new(redraw.clone());

        batch.push(sanitize_line("x"));

        tokio::time::timeout(std::time::Duration::from_secs(1), redraw.requested())
            .await
            .expect("redraw should have been requested");
    }
}
