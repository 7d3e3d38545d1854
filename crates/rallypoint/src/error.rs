//! Unified error type for the Rallypoint client.

use std::time::Duration;

use rallypoint_dispatch::DispatchError;
use rallypoint_protocol::{ProtocolError, ServerError};
use rallypoint_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `rallypoint` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A dispatch-level error, such as a reply of the wrong shape.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The server answered the request with an error.
    #[error(transparent)]
    Server(ServerError),

    /// An argument was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Channel message content could not be serialized.
    #[error("content serialization failed: {0}")]
    Content(#[from] serde_json::Error),

    /// No reply arrived within the configured request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection is closing or closed.
    #[error("not connected")]
    NotConnected,
}

impl ClientError {
    /// Maps dispatch errors that just mean "the connection went away" to
    /// [`ClientError::NotConnected`].
    pub(crate) fn from_dispatch(err: DispatchError) -> Self {
        match err {
            DispatchError::Closed | DispatchError::Abandoned(_) => Self::NotConnected,
            other => Self::Dispatch(other),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
