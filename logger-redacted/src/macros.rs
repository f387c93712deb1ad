// Logging macro that passes the formatted message through the default redactor
#[macro_export]
macro_rules! redacted_error {
    ($($arg:tt)+) => {
        tracing::error!("{}", $crate::redact(&format!($($arg)+)))
    };
}
