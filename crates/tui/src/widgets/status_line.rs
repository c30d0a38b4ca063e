//! Bottom status line: key hints, or the latest notification while it lasts.

use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use sl_protocol::Notification;
use sl_protocol::NotificationLevel;
use std::time::Duration;
use std::time::Instant;

/// How long a notification stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(4);

const KEY_HINTS: &str = "↑/↓ select  enter toggle  j/k scroll  g/G top/bottom  q quit";

#[derive(Debug, Default)]
pub struct StatusLine {
    toast: Option<(Notification, Instant)>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `notification`, replacing any previous one.
    pub fn push(&mut self, notification: Notification, now: Instant) {
        self.toast = Some((notification, now + TOAST_TTL));
    }

    /// Drop the notification once its time is up. Returns when the current
    /// one expires, if any is left.
    pub fn expire(&mut self, now: Instant) -> Option<Instant> {
        match &self.toast {
            Some((_, expires)) if *expires <= now => {
                self.toast = None;
                None
            }
            Some((_, expires)) => Some(*expires),
            None => None,
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.toast.as_ref().map(|(notification, _)| notification)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let paragraph = match self.current() {
            Some(notification) => {
                let color = match notification.level {
                    NotificationLevel::Info => Color::Cyan,
                    NotificationLevel::Warning => Color::Yellow,
                    NotificationLevel::Error => Color::Red,
                };
                Paragraph::new(notification.message.clone()).style(Style::default().fg(color))
            }
            None => Paragraph::new(KEY_HINTS).style(Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(paragraph, area);
    }
}
