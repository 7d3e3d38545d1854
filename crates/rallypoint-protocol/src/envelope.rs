//! The top-level wire unit and the classification of inbound frames.
//!
//! Every frame on the socket is exactly one [`Envelope`]:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ cid: "17"                            │  ← correlation id (may be empty)
//! │ ┌──────────────────────────────────┐ │
//! │ │ message: MatchCreate { }         │ │  ← exactly one payload variant
//! │ └──────────────────────────────────┘ │
//! └──────────────────────────────────────┘
//! ```
//!
//! Outbound envelopes always carry a cid. Inbound envelopes either carry a
//! cid (the response leg of one of our requests) or none (a server push).
//! [`Envelope::classify`] enforces that split.

use prost::Oneof;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::{ProtocolError, PushEvent, Reply};

/// One frame on the wire: an optional correlation id and one payload.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    /// Correlation id. Empty for unsolicited pushes.
    #[prost(string, tag = "1")]
    pub cid: String,

    /// The payload. `None` on the wire means an empty acknowledgement.
    #[prost(
        oneof = "Message",
        tags = "2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31"
    )]
    pub message: Option<Message>,
}

/// Every payload variant an envelope can carry, in either direction.
#[derive(Clone, PartialEq, Oneof, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    #[prost(message, tag = "2")]
    Channel(Channel),
    #[prost(message, tag = "3")]
    ChannelJoin(ChannelJoin),
    #[prost(message, tag = "4")]
    ChannelLeave(ChannelLeave),
    #[prost(message, tag = "5")]
    ChannelMessage(ChannelMessage),
    #[prost(message, tag = "6")]
    ChannelMessageAck(ChannelMessageAck),
    #[prost(message, tag = "7")]
    ChannelMessageSend(ChannelMessageSend),
    #[prost(message, tag = "8")]
    ChannelMessageUpdate(ChannelMessageUpdate),
    #[prost(message, tag = "9")]
    ChannelMessageRemove(ChannelMessageRemove),
    #[prost(message, tag = "10")]
    ChannelPresenceEvent(ChannelPresenceEvent),
    #[prost(message, tag = "11")]
    Error(ServerError),
    #[prost(message, tag = "12")]
    Match(Match),
    #[prost(message, tag = "13")]
    MatchCreate(MatchCreate),
    #[prost(message, tag = "14")]
    MatchData(MatchData),
    #[prost(message, tag = "15")]
    MatchDataSend(MatchDataSend),
    #[prost(message, tag = "16")]
    MatchJoin(MatchJoin),
    #[prost(message, tag = "17")]
    MatchLeave(MatchLeave),
    #[prost(message, tag = "18")]
    MatchPresenceEvent(MatchPresenceEvent),
    #[prost(message, tag = "19")]
    MatchmakerAdd(MatchmakerAdd),
    #[prost(message, tag = "20")]
    MatchmakerMatched(MatchmakerMatched),
    #[prost(message, tag = "21")]
    MatchmakerRemove(MatchmakerRemove),
    #[prost(message, tag = "22")]
    MatchmakerTicket(MatchmakerTicket),
    #[prost(message, tag = "23")]
    Notifications(Notifications),
    #[prost(message, tag = "24")]
    Rpc(Rpc),
    #[prost(message, tag = "25")]
    Status(Status),
    #[prost(message, tag = "26")]
    StatusFollow(StatusFollow),
    #[prost(message, tag = "27")]
    StatusPresenceEvent(StatusPresenceEvent),
    #[prost(message, tag = "28")]
    StatusUnfollow(StatusUnfollow),
    #[prost(message, tag = "29")]
    StatusUpdate(StatusUpdate),
    #[prost(message, tag = "30")]
    StreamData(StreamData),
    #[prost(message, tag = "31")]
    StreamPresenceEvent(StreamPresenceEvent),
}

impl Message {
    /// Variant name, for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Channel(_) => "channel",
            Self::ChannelJoin(_) => "channel_join",
            Self::ChannelLeave(_) => "channel_leave",
            Self::ChannelMessage(_) => "channel_message",
            Self::ChannelMessageAck(_) => "channel_message_ack",
            Self::ChannelMessageSend(_) => "channel_message_send",
            Self::ChannelMessageUpdate(_) => "channel_message_update",
            Self::ChannelMessageRemove(_) => "channel_message_remove",
            Self::ChannelPresenceEvent(_) => "channel_presence_event",
            Self::Error(_) => "error",
            Self::Match(_) => "match",
            Self::MatchCreate(_) => "match_create",
            Self::MatchData(_) => "match_data",
            Self::MatchDataSend(_) => "match_data_send",
            Self::MatchJoin(_) => "match_join",
            Self::MatchLeave(_) => "match_leave",
            Self::MatchPresenceEvent(_) => "match_presence_event",
            Self::MatchmakerAdd(_) => "matchmaker_add",
            Self::MatchmakerMatched(_) => "matchmaker_matched",
            Self::MatchmakerRemove(_) => "matchmaker_remove",
            Self::MatchmakerTicket(_) => "matchmaker_ticket",
            Self::Notifications(_) => "notifications",
            Self::Rpc(_) => "rpc",
            Self::Status(_) => "status",
            Self::StatusFollow(_) => "status_follow",
            Self::StatusPresenceEvent(_) => "status_presence_event",
            Self::StatusUnfollow(_) => "status_unfollow",
            Self::StatusUpdate(_) => "status_update",
            Self::StreamData(_) => "stream_data",
            Self::StreamPresenceEvent(_) => "stream_presence_event",
        }
    }
}

/// What an inbound envelope turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The response leg of a request we sent.
    Response { cid: String, reply: Reply },
    /// An unsolicited server push.
    Push(PushEvent),
    /// A server error that names no request.
    ServerError(ServerError),
}

impl Envelope {
    /// Builds an outbound request envelope.
    pub fn request(cid: impl Into<String>, message: Message) -> Self {
        Self {
            cid: cid.into(),
            message: Some(message),
        }
    }

    /// Sorts an inbound envelope into a response, a push, or a stray error.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] when the payload cannot
    /// appear in that position: a request variant echoed back, a push
    /// carrying a cid, or an empty envelope with no cid.
    pub fn classify(self) -> Result<Inbound, ProtocolError> {
        if self.cid.is_empty() {
            return match self.message {
                Some(Message::Error(err)) => Ok(Inbound::ServerError(err)),
                Some(message) => PushEvent::try_from(message)
                    .map(Inbound::Push)
                    .map_err(|message| {
                        ProtocolError::InvalidMessage(format!(
                            "uncorrelated {} is not a push event",
                            message.name()
                        ))
                    }),
                None => Err(ProtocolError::InvalidMessage(
                    "empty envelope without correlation id".into(),
                )),
            };
        }

        let reply = Reply::try_from(self.message).map_err(|message| {
            ProtocolError::InvalidMessage(format!(
                "{} cannot answer a request (cid {})",
                message.name(),
                self.cid
            ))
        })?;
        Ok(Inbound::Response {
            cid: self.cid,
            reply,
        })
    }
}
