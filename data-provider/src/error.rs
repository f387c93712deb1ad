use error_common::{ErrorKind, UserFacing};
use lab_api::LabApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Api(#[from] LabApiError),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Provider has been shut down")]
    ShutDown,

    /// A newer request replaced this one before it finished
    #[error("Request superseded")]
    Superseded,
}

impl UserFacing for ProviderError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(e) => e.kind(),
            Self::NotAuthenticated => ErrorKind::Unauthorized,
            Self::ShutDown | Self::Superseded => ErrorKind::Conflict,
        }
    }

    fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api(e) => e.server_message(),
            Self::NotAuthenticated | Self::ShutDown | Self::Superseded => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
