//! Error types for request validation and result decoding

use crate::analysis::AuthKeyRequirement;

/// Errors raised while building requests or decoding responses
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request parameter failed validation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A response value has a shape the decoder does not recognise
    #[error("unsupported result shape: {0}")]
    UnsupportedResultShape(String),

    /// The project is missing the key a request needs
    #[error("project has no {0} configured")]
    MissingKey(AuthKeyRequirement),

    /// URL construction failed
    #[error("invalid URL: {0}")]
    Url(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedResultShape(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
