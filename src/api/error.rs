//! API error types for the FogBugz client.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the FogBugz XML API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required argument was missing, empty or non-positive.
    ///
    /// Raised before any network activity.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A command other than `logon` was attempted without a session token.
    #[error("Not logged in: call login() before sending '{0}'")]
    Unauthenticated(String),

    /// The request did not complete within the transport deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server returned an empty or unreadable body.
    #[error("No XML returned")]
    NoResponse,

    /// The body could not be parsed as XML.
    #[error("Malformed XML response: {0}")]
    MalformedResponse(String),

    /// The server answered with an `<error>` element.
    #[error("FogBugz error: {0}")]
    Api(String),

    /// The response parsed, but lacks what the operation expects.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Network or HTTP error other than a timeout.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Keyring error when storing/retrieving tokens.
    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Shorthand for an `InvalidArgument` error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArgument(msg.into())
    }

    /// Shorthand for an `UnexpectedShape` error.
    pub fn shape(msg: impl Into<String>) -> Self {
        ApiError::UnexpectedShape(msg.into())
    }

    /// Whether this failure came from the transport rather than the API.
    ///
    /// Transport failures abort the call before any payload is interpreted.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_)
                | ApiError::NoResponse
                | ApiError::MalformedResponse(_)
                | ApiError::Network(_)
        )
    }
}
