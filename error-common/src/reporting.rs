// Error reporting: one log line plus one toast per failure

use crate::context::ErrorContext;
use crate::notify::{Notifier, Toast};
use crate::types::UserFacing;
use std::sync::Arc;

/// Routes errors and outcomes to the operator.
#[derive(Clone)]
pub struct ErrorReporter {
    notifier: Arc<dyn Notifier>,
}

impl ErrorReporter {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Log the error (redacted) and show its user message as an error toast.
    pub fn report<E: UserFacing + ?Sized>(&self, operation: &str, error: &E) {
        self.report_with_context(&ErrorContext::for_operation(operation), error);
    }

    pub fn report_with_context<E: UserFacing + ?Sized>(&self, context: &ErrorContext, error: &E) {
        let kind = error.kind();
        tracing::error!(
            operation = context.operation.as_deref().unwrap_or("unknown"),
            resource_id = context.resource_id.as_deref().unwrap_or(""),
            error_code = kind.code(),
            "{}",
            logger_redacted::redact(&error.to_string())
        );
        self.notifier.notify(Toast::error(error.user_message()));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notifier.notify(Toast::success(message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notifier.notify(Toast::info(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notifier.notify(Toast::warning(message));
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter").finish_non_exhaustive()
    }
}
