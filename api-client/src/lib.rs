//! HTTP boundary for the LabDesk backend.
//!
//! - [`ApiClient`]: one configurable client, bearer auth from an explicit
//!   [`Session`], one unauthorized policy (clear the session, broadcast
//!   [`SessionEvent::Expired`]).
//! - [`envelope`]: tolerant-but-loud decoding of `{success, data, message}`.
//! - [`ClientConfig`]: base URL and timeouts from defaults, `labdesk.toml`
//!   and `LABDESK_*` variables.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod session;

pub use client::{ApiClient, Download};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use session::{AuthSession, Role, Session, SessionEvent, SessionUser};
