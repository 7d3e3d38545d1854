//! Codec trait and implementations for serializing/deserializing envelopes.
//!
//! A "codec" (coder/decoder) converts between [`Envelope`]s and raw bytes.
//! The rest of the client doesn't care HOW an envelope is serialized; it
//! just needs something that implements [`Codec`].
//!
//! - [`ProtobufCodec`] is the default: compact binary frames, announced to
//!   the server as `format=protobuf`.
//! - [`JsonCodec`] (behind the `json` feature) produces readable frames,
//!   announced as `format=json`.

use std::fmt;
use std::sync::Arc;

use prost::Message as _;
use serde::{Deserialize, Serialize};

use crate::{Envelope, ProtocolError};

/// The encoding negotiated with the server when the socket is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Binary protobuf envelopes.
    #[default]
    Protobuf,
    /// Text JSON envelopes.
    #[cfg(feature = "json")]
    Json,
}

impl WireFormat {
    /// The value of the `format` query parameter for this encoding.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protobuf => "protobuf",
            #[cfg(feature = "json")]
            Self::Json => "json",
        }
    }

    /// Returns a shareable codec for this format.
    pub fn codec(self) -> Arc<dyn Codec> {
        match self {
            Self::Protobuf => Arc::new(ProtobufCodec),
            #[cfg(feature = "json")]
            Self::Json => Arc::new(JsonCodec),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts envelopes to bytes and back.
///
/// - `Send + Sync` → one codec is shared by every caller of a client and by
///   its receive loop.
/// - `'static` → the codec lives inside long-running tasks.
///
/// The methods take `&self` and no generics, so a codec can be used as
/// `Arc<dyn Codec>`.
pub trait Codec: Send + Sync + 'static {
    /// The format announced to the server for this codec.
    fn format(&self) -> WireFormat;

    /// Serializes an envelope into one frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` (or `JsonEncode`) if serialization fails.
    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one frame into an envelope.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` (or `JsonDecode`) for malformed or
    /// truncated bytes.
    fn decode(&self, data: &[u8]) -> Result<Envelope, ProtocolError>;
}

// ---------------------------------------------------------------------------
// ProtobufCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses protobuf (via `prost`).
///
/// ## Example
///
/// ```rust
/// use rallypoint_protocol::{Codec, Envelope, MatchCreate, Message, ProtobufCodec};
///
/// let codec = ProtobufCodec;
/// let envelope = Envelope::request("1", Message::MatchCreate(MatchCreate {}));
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl Codec for ProtobufCodec {
    fn format(&self) -> WireFormat {
        WireFormat::Protobuf
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::with_capacity(envelope.encoded_len());
        envelope.encode(&mut out).map_err(ProtocolError::Encode)?;
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Envelope, ProtocolError> {
        Envelope::decode(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Payloads are externally tagged by their snake_case variant name:
///
/// ```text
/// {"cid":"1","message":{"match_create":{}}}
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn format(&self) -> WireFormat {
        WireFormat::Json
    }

    fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(envelope).map_err(ProtocolError::JsonEncode)
    }

    fn decode(&self, data: &[u8]) -> Result<Envelope, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::JsonDecode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchDataSend, MatchmakerAdd};
    use crate::Message;
    #[cfg(feature = "json")]
    use crate::types::Match;

    fn sample() -> Envelope {
        Envelope::request(
            "12",
            Message::MatchDataSend(MatchDataSend {
                match_id: "match-1".into(),
                op_code: 42,
                data: vec![1, 2, 3],
                ..MatchDataSend::default()
            }),
        )
    }

    #[test]
    fn test_protobuf_round_trip_preserves_envelope() {
        let codec = ProtobufCodec;
        let bytes = codec.encode(&sample()).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(codec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_protobuf_decode_rejects_truncated_frame() {
        let codec = ProtobufCodec;
        let bytes = codec.encode(&sample()).unwrap();
        let err = codec.decode(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_protobuf_decode_rejects_garbage() {
        let err = ProtobufCodec.decode(&[0xff, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_protobuf_empty_ack_is_just_the_cid() {
        let ack = Envelope {
            cid: "5".into(),
            message: None,
        };
        // field 1, wire type 2, length 1, "5"
        assert_eq!(ProtobufCodec.encode(&ack).unwrap(), vec![0x0a, 0x01, b'5']);
    }

    #[test]
    fn test_protobuf_keeps_float_maps() {
        let mut add = MatchmakerAdd {
            min_count: 2,
            max_count: 4,
            query: "*".into(),
            ..MatchmakerAdd::default()
        };
        add.numeric_properties.insert("skill".into(), 12.5);
        let env = Envelope::request("0", Message::MatchmakerAdd(add.clone()));
        let decoded = ProtobufCodec.decode(&ProtobufCodec.encode(&env).unwrap()).unwrap();
        assert_eq!(decoded.message, Some(Message::MatchmakerAdd(add)));
    }

    #[test]
    fn test_wire_format_query_values() {
        assert_eq!(WireFormat::Protobuf.as_str(), "protobuf");
        assert_eq!(WireFormat::default(), WireFormat::Protobuf);
        assert_eq!(WireFormat::Protobuf.codec().format(), WireFormat::Protobuf);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_envelope_shape() {
        let env = Envelope::request(
            "3",
            Message::Match(Match {
                match_id: "m-9".into(),
                ..Match::default()
            }),
        );
        let bytes = JsonCodec.encode(&env).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["cid"], "3");
        assert_eq!(json["message"]["match"]["match_id"], "m-9");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_decode_tolerates_missing_fields() {
        let env = JsonCodec
            .decode(br#"{"message":{"match_data":{"match_id":"m","op_code":2}}}"#)
            .unwrap();
        assert_eq!(env.cid, "");
        match env.message {
            Some(Message::MatchData(data)) => {
                assert_eq!(data.op_code, 2);
                assert!(data.data.is_empty());
            }
            other => panic!("expected match_data, got {other:?}"),
        }
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_decode_rejects_malformed_text() {
        let err = JsonCodec.decode(b"{\"cid\":").unwrap_err();
        assert!(matches!(err, ProtocolError::JsonDecode(_)));
    }
}
