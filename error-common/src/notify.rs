//! Operator notifications ("toasts").
//!
//! Every outcome the operator should see, success or failure, goes through a
//! [`Notifier`]. The CLI prints them; tests record them with
//! [`MemoryNotifier`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, message)
    }
}

/// Sink for operator-visible notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Keeps every toast in memory, newest last.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().last().cloned()
    }

    pub fn last_message(&self) -> Option<String> {
        self.last().map(|t| t.message)
    }

    pub fn count(&self, level: ToastLevel) -> usize {
        self.toasts.lock().iter().filter(|t| t.level == level).count()
    }

    pub fn clear(&self) {
        self.toasts.lock().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }
}

/// Forwards toasts to the log only; used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        let message = logger_redacted::redact(&toast.message);
        match toast.level {
            ToastLevel::Success | ToastLevel::Info => tracing::info!(toast = %message),
            ToastLevel::Warning => tracing::warn!(toast = %message),
            ToastLevel::Error => tracing::error!(toast = %message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Toast::success("Patient registered"));
        notifier.notify(Toast::error("Doctor is required"));

        assert_eq!(notifier.toasts().len(), 2);
        assert_eq!(notifier.count(ToastLevel::Error), 1);
        assert_eq!(notifier.last_message().as_deref(), Some("Doctor is required"));

        notifier.clear();
        assert!(notifier.last().is_none());
    }
}
