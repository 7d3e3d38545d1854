//! Error types for the protocol layer.
//!
//! Each crate in Rallypoint defines its own error enum. When you see a
//! `ProtocolError`, the problem is in turning envelopes into bytes or
//! bytes into envelopes, not in the socket or in request bookkeeping.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Protobuf serialization failed.
    #[error("encode failed: {0}")]
    Encode(prost::EncodeError),

    /// Protobuf deserialization failed.
    ///
    /// Common causes: truncated frames, corrupt bytes, or a frame that was
    /// encoded with a different format than the one negotiated.
    #[error("decode failed: {0}")]
    Decode(prost::DecodeError),

    /// JSON serialization failed.
    #[cfg(feature = "json")]
    #[error("json encode failed: {0}")]
    JsonEncode(serde_json::Error),

    /// JSON deserialization failed.
    #[cfg(feature = "json")]
    #[error("json decode failed: {0}")]
    JsonDecode(serde_json::Error),

    /// The envelope decoded, but its contents break the protocol rules,
    /// e.g. a push event carrying a correlation id, or a request variant
    /// arriving as a response.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
