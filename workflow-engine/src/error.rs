use error_common::{ErrorKind, UserFacing};
use lab_api::LabApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Api(#[from] LabApiError),

    /// Rejected client-side; nothing was sent
    #[error("{0}")]
    Blocked(String),

    #[error("A submission is already in progress")]
    AlreadySubmitting,

    #[error("Order {order_id} is not ready: {reason}")]
    NotReady { order_id: String, reason: String },

    #[error("Unknown {what}: {name}")]
    Unknown { what: &'static str, name: String },
}

impl WorkflowError {
    pub fn blocked(message: impl Into<String>) -> Self {
        Self::Blocked(message.into())
    }

    /// True when the failure happened before any request was issued.
    pub fn is_client_side(&self) -> bool {
        match self {
            Self::Api(e) => e.is_validation(),
            Self::Blocked(_) | Self::AlreadySubmitting | Self::NotReady { .. } | Self::Unknown { .. } => true,
        }
    }
}

impl UserFacing for WorkflowError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::Blocked(_) | Self::Unknown { .. } => ErrorKind::Validation,
            Self::AlreadySubmitting | Self::NotReady { .. } => ErrorKind::Conflict,
        }
    }

    fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api(e) => e.server_message(),
            Self::Blocked(message) | Self::NotReady { reason: message, .. } => Some(message),
            Self::AlreadySubmitting => Some("A submission is already in progress"),
            Self::Unknown { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
