//! Scrollable log body of one step.
//!
//! [`LogViewport`] is the TUI's [`LogSurface`]: it keeps the styled lines
//! appended so far and a scroll offset. It supports keyboard navigation
//! (j/k, PageUp/PageDown, g/G) and shows a scrollbar when the content is
//! taller than the area.

use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Text;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Scrollbar;
use ratatui::widgets::ScrollbarOrientation;
use ratatui::widgets::ScrollbarState;
use ratatui::Frame;
use sl_core::render::LogSurface;
use sl_core::render::SanitizedLine;

#[derive(Debug, Default)]
pub struct LogViewport {
    lines: Vec<Line<'static>>,
    /// Number of lines scrolled from the top.
    scroll_offset: usize,
    /// Visible rows at the last render.
    height: usize,
}

impl LogViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Largest useful scroll offset for the current height.
    pub fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub fn page_size(&self) -> usize {
        self.height.max(1)
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + 1).min(self.max_offset());
    }

    pub fn page_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(self.page_size());
    }

    pub fn page_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + self.page_size()).min(self.max_offset());
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    /// Render into `area`, remembering its height for later scrolling.
    pub fn render(&mut self, frame: &mut Frame, area: Rect, title: &str, placeholder: &str) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title.to_string());

        // Subtract 2 for borders
        self.height = area.height.saturating_sub(2) as usize;
        self.scroll_offset = self.scroll_offset.min(self.max_offset());

        let paragraph = if self.lines.is_empty() {
            Paragraph::new(placeholder.to_string())
                .style(Style::default().fg(Color::DarkGray))
                .block(block)
        } else {
            let end = (self.scroll_offset + self.height).min(self.lines.len());
            let visible = self.lines[self.scroll_offset..end].to_vec();
            Paragraph::new(Text::from(visible)).block(block)
        };

        frame.render_widget(paragraph, area);

        if self.lines.len() > self.height {
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(self.max_offset() + 1)
                .viewport_content_length(self.height)
                .position(self.scroll_offset);

            let scrollbar = Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));

            frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
        }
    }
}

impl LogSurface for LogViewport {
    fn append_lines(&mut self, lines: Vec<SanitizedLine>) {
        self.lines
            .extend(lines.into_iter().flat_map(SanitizedLine::into_lines));
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.scroll_offset = 0;
    }

    fn is_at_bottom(&self) -> bool {
        self.scroll_offset >= self.max_offset()
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_offset();
    }
}
