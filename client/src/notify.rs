//! User-facing notifications.
//!
//! The controller reports the outcome of every submission as a
//! [`Notification`]. Where it ends up (a toast, stdout, a log line) is up to
//! the [`Notifier`] the front-end supplies.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Default,
    /// A failure the user should notice.
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == Variant::Destructive
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Emits notifications as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.variant {
            Variant::Default => {
                tracing::info!(title = %n.title, description = %n.description, "notification")
            }
            Variant::Destructive => {
                tracing::warn!(title = %n.title, description = %n.description, "notification")
            }
        }
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: parking_lot::Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.seen.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notification::failure("Failed to init vault", "error: NotReached"));
        notifier.notify(Notification::success("Success", "done"));

        let seen = notifier.notifications();
        assert_eq!(seen.len(), 2);
        assert_eq!(notifier.last().unwrap().title, "Success");
        assert!(seen[0].is_destructive());
        assert_eq!(seen[0].to_string(), "Failed to init vault: error: NotReached");
    }

    #[test]
    fn variant_serializes_lowercase() {
        let json = serde_json::to_string(&Notification::success("Success", "ok")).unwrap();
        assert!(json.contains("\"variant\":\"default\""));
    }
}
