//! Wire protocol for Rallypoint.
//!
//! This crate defines the "language" the client and the game server speak:
//!
//! - **Envelope** ([`Envelope`], [`Message`]): the single unit on the
//!   wire, holding a correlation id plus exactly one payload variant.
//! - **Types** ([`Match`], [`Channel`], [`MatchData`], ...): the payloads.
//! - **Replies and pushes** ([`Reply`], [`PushEvent`]): the tagged shapes
//!   an inbound envelope is sorted into by [`Envelope::classify`].
//! - **Codec** ([`Codec`] trait, [`ProtobufCodec`], [`JsonCodec`]): how
//!   envelopes are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and dispatch
//! (request correlation and event fan-out). It doesn't know about
//! connections. It only knows how to serialize, deserialize and classify.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope → Inbound) → Dispatch (tickets, subscribers)
//! ```

mod codec;
mod envelope;
mod error;
mod push;
mod reply;
mod types;

pub use codec::{Codec, ProtobufCodec, WireFormat};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use envelope::{Envelope, Inbound, Message};
pub use error::ProtocolError;
pub use push::{EventKind, FromPush, PushEvent};
pub use reply::{FromReply, Reply, ReplyKind};
pub use types::{
    Channel, ChannelJoin, ChannelLeave, ChannelMessage, ChannelMessageAck,
    ChannelMessageRemove, ChannelMessageSend, ChannelMessageUpdate,
    ChannelPresenceEvent, ChannelType, Match, MatchCreate, MatchData,
    MatchDataSend, MatchJoin, MatchLeave, MatchPresenceEvent, MatchTarget,
    MatchmakerAdd, MatchmakerMatched, MatchmakerRemove, MatchmakerTicket,
    MatchmakerUser, Notification, Notifications, Rpc, ServerError, Status,
    StatusFollow, StatusPresenceEvent, StatusUnfollow, StatusUpdate, Stream,
    StreamData, StreamPresenceEvent, UserPresence,
};
