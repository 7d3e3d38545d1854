//! Server-pushed events.
//!
//! A push is an envelope without a correlation id. Each push variant has
//! its own [`EventKind`], and subscribers pick the kinds they care about.

use std::fmt;

use crate::types::{
    ChannelMessage, ChannelPresenceEvent, MatchData, MatchPresenceEvent, MatchmakerMatched,
    Notifications, StatusPresenceEvent, StreamData, StreamPresenceEvent,
};
use crate::Message;

/// The kinds of push event the server can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ChannelPresence,
    MatchmakerMatched,
    MatchData,
    MatchPresence,
    Notifications,
    StatusPresence,
    StreamPresence,
    StreamData,
    ChannelMessage,
}

impl EventKind {
    /// Every kind, in a fixed order. `ALL[k.index()] == k`.
    pub const ALL: [EventKind; 9] = [
        Self::ChannelPresence,
        Self::MatchmakerMatched,
        Self::MatchData,
        Self::MatchPresence,
        Self::Notifications,
        Self::StatusPresence,
        Self::StreamPresence,
        Self::StreamData,
        Self::ChannelMessage,
    ];

    /// Position of this kind in [`EventKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChannelPresence => "channel_presence_event",
            Self::MatchmakerMatched => "matchmaker_matched",
            Self::MatchData => "match_data",
            Self::MatchPresence => "match_presence_event",
            Self::Notifications => "notifications",
            Self::StatusPresence => "status_presence_event",
            Self::StreamPresence => "stream_presence_event",
            Self::StreamData => "stream_data",
            Self::ChannelMessage => "channel_message",
        };
        f.write_str(name)
    }
}

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    ChannelPresence(ChannelPresenceEvent),
    MatchmakerMatched(MatchmakerMatched),
    MatchData(MatchData),
    MatchPresence(MatchPresenceEvent),
    Notifications(Notifications),
    StatusPresence(StatusPresenceEvent),
    StreamPresence(StreamPresenceEvent),
    StreamData(StreamData),
    ChannelMessage(ChannelMessage),
}

impl PushEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ChannelPresence(_) => EventKind::ChannelPresence,
            Self::MatchmakerMatched(_) => EventKind::MatchmakerMatched,
            Self::MatchData(_) => EventKind::MatchData,
            Self::MatchPresence(_) => EventKind::MatchPresence,
            Self::Notifications(_) => EventKind::Notifications,
            Self::StatusPresence(_) => EventKind::StatusPresence,
            Self::StreamPresence(_) => EventKind::StreamPresence,
            Self::StreamData(_) => EventKind::StreamData,
            Self::ChannelMessage(_) => EventKind::ChannelMessage,
        }
    }
}

/// Fails with the original message when the variant is not a push.
impl TryFrom<Message> for PushEvent {
    type Error = Message;

    fn try_from(message: Message) -> Result<Self, Message> {
        match message {
            Message::ChannelPresenceEvent(v) => Ok(Self::ChannelPresence(v)),
            Message::MatchmakerMatched(v) => Ok(Self::MatchmakerMatched(v)),
            Message::MatchData(v) => Ok(Self::MatchData(v)),
            Message::MatchPresenceEvent(v) => Ok(Self::MatchPresence(v)),
            Message::Notifications(v) => Ok(Self::Notifications(v)),
            Message::StatusPresenceEvent(v) => Ok(Self::StatusPresence(v)),
            Message::StreamPresenceEvent(v) => Ok(Self::StreamPresence(v)),
            Message::StreamData(v) => Ok(Self::StreamData(v)),
            Message::ChannelMessage(v) => Ok(Self::ChannelMessage(v)),
            other => Err(other),
        }
    }
}

impl From<PushEvent> for Message {
    fn from(event: PushEvent) -> Self {
        match event {
            PushEvent::ChannelPresence(v) => Self::ChannelPresenceEvent(v),
            PushEvent::MatchmakerMatched(v) => Self::MatchmakerMatched(v),
            PushEvent::MatchData(v) => Self::MatchData(v),
            PushEvent::MatchPresence(v) => Self::MatchPresenceEvent(v),
            PushEvent::Notifications(v) => Self::Notifications(v),
            PushEvent::StatusPresence(v) => Self::StatusPresenceEvent(v),
            PushEvent::StreamPresence(v) => Self::StreamPresenceEvent(v),
            PushEvent::StreamData(v) => Self::StreamData(v),
            PushEvent::ChannelMessage(v) => Self::ChannelMessage(v),
        }
    }
}

/// A push payload type that can be subscribed to on its own.
pub trait FromPush: Sized + Send + 'static {
    const KIND: EventKind;

    /// Returns `None` unless `event` is of kind [`Self::KIND`].
    fn from_push(event: PushEvent) -> Option<Self>;
}

macro_rules! impl_from_push {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl FromPush for $ty {
                const KIND: EventKind = EventKind::$variant;

                fn from_push(event: PushEvent) -> Option<Self> {
                    match event {
                        PushEvent::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_push!(
    ChannelPresenceEvent => ChannelPresence,
    MatchmakerMatched => MatchmakerMatched,
    MatchData => MatchData,
    MatchPresenceEvent => MatchPresence,
    Notifications => Notifications,
    StatusPresenceEvent => StatusPresence,
    StreamPresenceEvent => StreamPresence,
    StreamData => StreamData,
    ChannelMessage => ChannelMessage,
);
