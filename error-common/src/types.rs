use serde::{Deserialize, Serialize};

/// Generic text shown when neither the server nor the client supplied one.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Category of a failure, independent of the crate that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response at all: DNS, connect, timeout, TLS
    Transport,
    /// Non-2xx status or a `success: false` body
    Http,
    /// HTTP 401; the session has been cleared
    Unauthorized,
    /// Rejected on the client before any request was issued
    Validation,
    /// The response did not have any of the accepted shapes
    Decode,
    /// Bad or missing client configuration
    Configuration,
    /// Workflow precondition or other local invariant
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Operator-facing text used when no specific message is available.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Transport => "Unable to reach the lab server. Check your connection and try again.",
            Self::Unauthorized => "Your session has expired. Please log in again.",
            Self::Validation => "Please check the highlighted fields and try again.",
            Self::Decode => "The lab server returned an unexpected response.",
            Self::Configuration => "LabDesk is not configured correctly.",
            Self::Http | Self::Conflict | Self::Internal => FALLBACK_MESSAGE,
        }
    }
}

/// Errors that can be shown to the operator.
pub trait UserFacing: std::error::Error {
    fn kind(&self) -> ErrorKind;

    /// Message supplied by the backend envelope or by client-side validation.
    fn server_message(&self) -> Option<&str> {
        None
    }

    /// Server message when present and non-blank, otherwise the fallback for
    /// the error kind.
    fn user_message(&self) -> String {
        self.server_message()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map_or_else(|| self.kind().fallback_message().to_string(), str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("backend said: {0:?}")]
    struct Backend(Option<String>, ErrorKind);

    impl UserFacing for Backend {
        fn kind(&self) -> ErrorKind {
            self.1
        }
        fn server_message(&self) -> Option<&str> {
            self.0.as_deref()
        }
    }

    #[test]
    fn test_server_message_wins() {
        let err = Backend(Some("Patient not found".into()), ErrorKind::Http);
        assert_eq!(err.user_message(), "Patient not found");
    }

    #[test]
    fn test_blank_message_falls_back() {
        let err = Backend(Some("   ".into()), ErrorKind::Http);
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_transport_fallback() {
        let err = Backend(None, ErrorKind::Transport);
        assert!(err.user_message().starts_with("Unable to reach"));
    }
}
