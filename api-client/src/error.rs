use error_common::{ErrorKind, UserFacing};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error calling {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} failed with status {status}: {}", message.as_deref().unwrap_or("no message"))]
    Http {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Unauthorized calling {endpoint}")]
    Unauthorized {
        endpoint: String,
        message: Option<String>,
    },

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }
}

impl UserFacing for ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Http { .. } => ErrorKind::Http,
            Self::Unauthorized { .. } | Self::NotAuthenticated => ErrorKind::Unauthorized,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Config(_) => ErrorKind::Configuration,
        }
    }

    fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } | Self::Unauthorized { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::Config(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
