// Standardized error codes, attached to every reported error log line

use crate::types::ErrorKind;

pub mod transport {
    pub const NO_RESPONSE: &str = "NET_1001";
}

pub mod http {
    pub const SERVER_REJECTED: &str = "HTTP_2001";
    pub const UNAUTHORIZED: &str = "HTTP_2002";
    pub const UNEXPECTED_SHAPE: &str = "HTTP_2003";
}

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_3001";
}

pub mod client {
    pub const CONFIGURATION: &str = "CLIENT_4001";
    pub const WORKFLOW_CONFLICT: &str = "CLIENT_4002";
    pub const INTERNAL: &str = "CLIENT_4003";
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Transport => transport::NO_RESPONSE,
            Self::Http => http::SERVER_REJECTED,
            Self::Unauthorized => http::UNAUTHORIZED,
            Self::Decode => http::UNEXPECTED_SHAPE,
            Self::Validation => validation::INVALID_INPUT,
            Self::Configuration => client::CONFIGURATION,
            Self::Conflict => client::WORKFLOW_CONFLICT,
            Self::Internal => client::INTERNAL,
        }
    }
}
