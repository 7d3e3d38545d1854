//! Typed replies to correlated requests.
//!
//! Each request declares up front which [`ReplyKind`] it expects. When the
//! response arrives, its payload is turned into a [`Reply`] and checked
//! against that declaration, so a request never has to guess at runtime
//! what it got back.

use std::fmt;

use crate::types::{Channel, ChannelMessageAck, Match, MatchmakerTicket, Rpc, ServerError, Status};
use crate::Message;

/// The successful reply shapes a request can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// An empty acknowledgement.
    Ack,
    Channel,
    ChannelMessageAck,
    Match,
    MatchmakerTicket,
    Rpc,
    Status,
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ack => "ack",
            Self::Channel => "channel",
            Self::ChannelMessageAck => "channel_message_ack",
            Self::Match => "match",
            Self::MatchmakerTicket => "matchmaker_ticket",
            Self::Rpc => "rpc",
            Self::Status => "status",
        };
        f.write_str(name)
    }
}

/// The payload of a correlated response.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ack,
    Channel(Channel),
    ChannelMessageAck(ChannelMessageAck),
    Match(Match),
    MatchmakerTicket(MatchmakerTicket),
    Rpc(Rpc),
    Status(Status),
    /// The server rejected the request. Valid for every [`ReplyKind`].
    Error(ServerError),
}

impl Reply {
    /// The kind of this reply, or `None` for [`Reply::Error`].
    pub fn kind(&self) -> Option<ReplyKind> {
        match self {
            Self::Ack => Some(ReplyKind::Ack),
            Self::Channel(_) => Some(ReplyKind::Channel),
            Self::ChannelMessageAck(_) => Some(ReplyKind::ChannelMessageAck),
            Self::Match(_) => Some(ReplyKind::Match),
            Self::MatchmakerTicket(_) => Some(ReplyKind::MatchmakerTicket),
            Self::Rpc(_) => Some(ReplyKind::Rpc),
            Self::Status(_) => Some(ReplyKind::Status),
            Self::Error(_) => None,
        }
    }

    /// Returns `true` if this reply may resolve a request expecting `expected`.
    pub fn satisfies(&self, expected: ReplyKind) -> bool {
        self.kind().is_none_or(|kind| kind == expected)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Channel(_) => "channel",
            Self::ChannelMessageAck(_) => "channel_message_ack",
            Self::Match(_) => "match",
            Self::MatchmakerTicket(_) => "matchmaker_ticket",
            Self::Rpc(_) => "rpc",
            Self::Status(_) => "status",
            Self::Error(_) => "error",
        }
    }
}

/// Converts a response payload into a [`Reply`].
///
/// Fails with the original message when the variant is not a reply
/// (request variants and push events).
impl TryFrom<Option<Message>> for Reply {
    type Error = Message;

    fn try_from(message: Option<Message>) -> Result<Self, Message> {
        let Some(message) = message else {
            return Ok(Self::Ack);
        };
        match message {
            Message::Channel(v) => Ok(Self::Channel(v)),
            Message::ChannelMessageAck(v) => Ok(Self::ChannelMessageAck(v)),
            Message::Match(v) => Ok(Self::Match(v)),
            Message::MatchmakerTicket(v) => Ok(Self::MatchmakerTicket(v)),
            Message::Rpc(v) => Ok(Self::Rpc(v)),
            Message::Status(v) => Ok(Self::Status(v)),
            Message::Error(v) => Ok(Self::Error(v)),
            other => Err(other),
        }
    }
}

/// A result type that a request can wait for.
///
/// `KIND` is what the request declares when it reserves its ticket;
/// [`from_reply`](Self::from_reply) unwraps a reply of that kind.
pub trait FromReply: Sized + Send + 'static {
    const KIND: ReplyKind;

    /// Extracts `Self` from a reply of kind [`Self::KIND`].
    ///
    /// Returns `None` for any other reply.
    fn from_reply(reply: Reply) -> Option<Self>;
}

impl FromReply for () {
    const KIND: ReplyKind = ReplyKind::Ack;

    fn from_reply(reply: Reply) -> Option<Self> {
        matches!(reply, Reply::Ack).then_some(())
    }
}

macro_rules! impl_from_reply {
    ($($ty:ident),* $(,)?) => {
        $(
            impl FromReply for $ty {
                const KIND: ReplyKind = ReplyKind::$ty;

                fn from_reply(reply: Reply) -> Option<Self> {
                    match reply {
                        Reply::$ty(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_reply!(Channel, ChannelMessageAck, Match, MatchmakerTicket, Rpc, Status);
