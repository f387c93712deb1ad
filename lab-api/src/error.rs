use api_client::ApiError;
use error_common::{ErrorKind, UserFacing};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabApiError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Rejected before any request was issued
    #[error("Validation error: {0}")]
    Validation(String),
}

impl LabApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl UserFacing for LabApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api(e) => e.server_message(),
            Self::Validation(message) => Some(message),
        }
    }
}

pub type LabApiResult<T> = Result<T, LabApiError>;
