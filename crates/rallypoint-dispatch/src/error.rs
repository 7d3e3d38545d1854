//! Error types for the dispatch layer.

use rallypoint_protocol::ReplyKind;

/// Errors from the correlation table and the event dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The table or dispatcher was shut down along with its connection.
    #[error("dispatcher is closed")]
    Closed,

    /// The ticket was dropped without a reply: the request was abandoned
    /// (timeout, send failure) or the connection went away first.
    #[error("request {0} was abandoned before a reply arrived")]
    Abandoned(u64),

    /// A reply named a correlation id that was never issued.
    #[error("no request with correlation id {0} was ever sent")]
    UnknownTicket(u64),

    /// A reply named a correlation id that was issued but is no longer
    /// pending (already resolved, or abandoned).
    #[error("request {0} is no longer pending")]
    AlreadyResolved(u64),

    /// The correlation id on the wire is not one this client generates.
    #[error("invalid correlation id {0:?}")]
    InvalidCorrelationId(String),

    /// The reply's shape does not match what the request declared.
    #[error("request {id} expected a {expected} reply, got {got}")]
    UnexpectedReply {
        id: u64,
        expected: ReplyKind,
        got: &'static str,
    },
}
