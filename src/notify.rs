//! Notification delivery.
//!
//! Sinks are fire-and-forget: the engine hands over a `{title, message}` pair
//! and never waits for an acknowledgment.

use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Default on-screen lifetime of a notification.
pub const DEFAULT_DURATION_MS: u64 = 5000;

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Something that can show a notification to the user.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Prints notifications to stdout, optionally ringing the terminal bell.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    bell: bool,
}

impl ConsoleSink {
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }
}

impl NotificationSink for ConsoleSink {
    fn notify(&self, notification: Notification) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "[{}] {}", notification.title, notification.message);
        if self.bell {
            // BEL works in most terminal emulators
            let _ = write!(stdout, "\x07");
        }
        let _ = stdout.flush();
        tracing::info!(
            title = %notification.title,
            duration = ?notification.duration_ms.map(Duration::from_millis),
            "notification delivered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl NotificationSink for Recorder {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    #[test]
    fn test_notification_builder() {
        let n = Notification::new("Price Alert: AAPL", "moved").with_duration(3000);
        assert_eq!(n.duration_ms, Some(3000));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["durationMs"], 3000);
        assert!(serde_json::to_value(Notification::new("a", "b")).unwrap().get("durationMs").is_none());
    }

    #[test]
    fn test_arc_sink_forwards() {
        let recorder = Arc::new(Recorder::default());
        let sink: Arc<dyn NotificationSink> = recorder.clone();
        sink.notify(Notification::new("t", "m"));
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }
}
