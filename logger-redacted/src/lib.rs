//! Structured logging for LabDesk with patient PII redaction.
//!
//! Patient phone numbers and email addresses travel through almost every
//! request this workspace makes, and bearer tokens sit in every header. All
//! error text that reaches a log line goes through [`redact`] first.
//!
//! ```rust,no_run
//! use logger_redacted::{init_logging, LoggerConfig, redacted_error};
//!
//! init_logging(&LoggerConfig::from_env(false)).ok();
//! redacted_error!("Failed to register patient {}", "9999900000");
//! // Output: "Failed to register patient PHONE[...]"
//! ```

pub mod config;
pub mod macros;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use lazy_static::lazy_static;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

lazy_static! {
    static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::default();
}

static REDACTION_ENABLED: AtomicBool = AtomicBool::new(true);

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Logger initialization failed: {0}")]
    Init(String),
}

/// Redact text with the process-wide redactor.
///
/// Returns the input unchanged when redaction was switched off through
/// [`LoggerConfig::redaction_enabled`].
pub fn redact(text: &str) -> String {
    if REDACTION_ENABLED.load(Ordering::Relaxed) {
        DEFAULT_REDACTOR.redact(text)
    } else {
        text.to_string()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set.
///
/// # Errors
///
/// Fails when the filter directive is malformed or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggerConfig) -> Result<(), LoggerError> {
    REDACTION_ENABLED.store(config.redaction_enabled, Ordering::Relaxed);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| LoggerError::Filter(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| LoggerError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_reported() {
        std::env::remove_var("RUST_LOG");
        let config = LoggerConfig {
            log_level: "labdesk=verbose".to_string(),
            ..Default::default()
        };
        assert!(matches!(init_logging(&config), Err(LoggerError::Filter(_))));
    }

    #[test]
    fn test_default_redact_masks_email() {
        let redacted = redact("sent to asha@example.com");
        assert!(redacted.contains("EMAIL["));
    }
}
