//! User-facing notifications.
//!
//! Every user action ends in exactly one notice: a success message, or the
//! error that stopped it.

use std::sync::{Arc, Mutex};

use crate::error::GroupCalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Fire-and-forget sink for notices.
pub trait Notifier {
    fn notify(&self, kind: NoticeKind, message: &str);

    fn success(&self, message: &str) {
        self.notify(NoticeKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeKind::Error, message);
    }

    /// Report the outcome of an action: `describe` builds the success text,
    /// errors are shown as-is. Returns the value on success.
    fn report<T>(&self, result: GroupCalResult<T>, describe: impl FnOnce(&T) -> String) -> Option<T>
    where
        Self: Sized,
    {
        match result {
            Ok(value) => {
                self.success(&describe(&value));
                Some(value)
            }
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), error = %e, "action failed");
                self.error(&e.to_string());
                None
            }
        }
    }
}

/// Notifier that keeps every notice, for tests and batch callers.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<(NoticeKind, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push((kind, message.to_string()));
        }
    }
}
