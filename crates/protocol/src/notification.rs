//! Transient user-visible notifications.
//!
//! Failures in the log pipeline never propagate as fatal errors. They are
//! reported through this side channel instead, and the UI shows them as
//! short-lived toasts.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Severity of a notification.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user, shown once and then dismissed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Notification {
    #[ts(type = "string")]
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }
}
