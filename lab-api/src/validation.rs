//! Client-side form validation.
//!
//! Every create/update payload implements [`RequestValidation`]; resource
//! functions call it before building a request, so a rejected form never
//! reaches the network.

use crate::error::LabApiError;

pub trait RequestValidation {
    /// # Errors
    ///
    /// Returns [`LabApiError::Validation`] with an operator-facing message
    /// naming the first offending field.
    fn validate(&self) -> Result<(), LabApiError>;
}

/// Return a validation error unless `$predicate` holds.
#[macro_export]
macro_rules! validate_field {
    ($predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::LabApiError::validation($message));
        }
    };
}

/// Non-blank string field.
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(!$field.trim().is_empty(), $message);
    };
}

/// Optional string field that must be present and non-blank.
#[macro_export]
macro_rules! validate_present {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(
            $field.as_deref().is_some_and(|v: &str| !v.trim().is_empty()),
            $message
        );
    };
}

/// Inclusive numeric range.
#[macro_export]
macro_rules! validate_range {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        $crate::validate_field!($field >= $min && $field <= $max, $message);
    };
}

/// Basic email shape check, skipped for `None` or blank values.
#[macro_export]
macro_rules! validate_optional_email {
    ($field:expr, $message:expr) => {
        if let Some(email) = $field.as_deref().map(str::trim).filter(|e: &&str| !e.is_empty()) {
            $crate::validate_field!(
                email.contains('@') && email.rsplit('@').next().is_some_and(|d| d.contains('.')),
                $message
            );
        }
    };
}

/// Ten-digit phone number, optionally prefixed with +91, spaces and dashes
/// ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    let local = trimmed.strip_prefix("+91").unwrap_or(trimmed);
    let digits: String = local.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit())
}
