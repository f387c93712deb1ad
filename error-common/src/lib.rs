//! Common error handling for LabDesk
//!
//! Every failure in the workspace ends up in one of three places the operator
//! can see: a transport failure (no response), an HTTP error with the
//! backend's `message`, or a client-side validation failure caught before any
//! request is sent. This crate gives them one taxonomy ([`ErrorKind`]), one
//! way to phrase them ([`UserFacing::user_message`]) and one channel to
//! surface them ([`ErrorReporter`] → [`Notifier`]).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use error_common::{ErrorKind, ErrorReporter, MemoryNotifier, UserFacing};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("amount must be greater than zero")]
//! struct AmountError;
//!
//! impl UserFacing for AmountError {
//!     fn kind(&self) -> ErrorKind {
//!         ErrorKind::Validation
//!     }
//!     fn server_message(&self) -> Option<&str> {
//!         Some("Amount must be greater than zero")
//!     }
//! }
//!
//! let notifier = Arc::new(MemoryNotifier::new());
//! let reporter = ErrorReporter::new(notifier.clone());
//! reporter.report("create_expense", &AmountError);
//! assert_eq!(notifier.last_message().as_deref(), Some("Amount must be greater than zero"));
//! ```

pub mod codes;
pub mod context;
pub mod notify;
pub mod reporting;
pub mod types;

pub use codes::*;
pub use context::*;
pub use notify::*;
pub use reporting::*;
pub use types::*;
