//! Payload messages that travel inside an [`Envelope`](crate::Envelope).
//!
//! Every type here is a protobuf message declared with `prost`'s derive
//! macros instead of a `.proto` file plus a build script. The field tags
//! are part of the wire contract: renaming a field is free, changing its
//! tag is a breaking change.
//!
//! The same structs also derive serde so the JSON codec can carry them.
//! `#[serde(default)]` lets a JSON peer omit any field, mirroring protobuf
//! where every absent field decodes to its zero value.
//!
//! Timestamps are milliseconds since the Unix epoch.

use std::collections::HashMap;

use prost::{Enumeration, Message, Oneof};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shared building blocks
// ---------------------------------------------------------------------------

/// A user currently present on a match, channel, stream or status feed.
#[derive(Clone, PartialEq, Eq, Hash, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPresence {
    #[prost(string, tag = "1")]
    pub user_id: String,
    /// One user may hold several sockets; each gets its own session id.
    #[prost(string, tag = "2")]
    pub session_id: String,
    #[prost(string, tag = "3")]
    pub username: String,
    /// Whether messages sent by this presence are stored server-side.
    #[prost(bool, tag = "4")]
    pub persistence: bool,
    #[prost(string, optional, tag = "5")]
    pub status: Option<String>,
}

/// Identifies a realtime stream on the server.
#[derive(Clone, PartialEq, Eq, Hash, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Stream {
    #[prost(int32, tag = "1")]
    pub mode: i32,
    #[prost(string, tag = "2")]
    pub subject: String,
    #[prost(string, tag = "3")]
    pub subcontext: String,
    #[prost(string, tag = "4")]
    pub label: String,
}

/// How a match is addressed: by its id, or by a matchmaker token.
#[derive(Clone, PartialEq, Eq, Hash, Oneof, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTarget {
    #[prost(string, tag = "2")]
    MatchId(String),
    #[prost(string, tag = "3")]
    Token(String),
}

// ---------------------------------------------------------------------------
// Errors reported by the server
// ---------------------------------------------------------------------------

/// The server's report that an operation failed.
///
/// Arrives as the reply to a request (application-level failure) or, without
/// a correlation id, when the server could not attribute the failure to any
/// request.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize, thiserror::Error)]
#[serde(default)]
#[error("server error {code}: {message}")]
pub struct ServerError {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(map = "string, string", tag = "3")]
    pub context: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Chat channels
// ---------------------------------------------------------------------------

/// The kind of chat channel to join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration, Serialize, Deserialize)]
#[repr(i32)]
pub enum ChannelType {
    Unspecified = 0,
    Room = 1,
    DirectMessage = 2,
    Group = 3,
}

/// A joined chat channel (reply to [`ChannelJoin`]).
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(message, repeated, tag = "2")]
    pub presences: Vec<UserPresence>,
    /// The joining user's own presence.
    #[prost(message, optional, tag = "3")]
    pub self_presence: Option<UserPresence>,
    #[prost(string, tag = "4")]
    pub room_name: String,
    #[prost(string, tag = "5")]
    pub group_id: String,
    #[prost(string, tag = "6")]
    pub user_id_one: String,
    #[prost(string, tag = "7")]
    pub user_id_two: String,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelJoin {
    /// Room name, group id, or the other user's id, depending on `kind`.
    #[prost(string, tag = "1")]
    pub target: String,
    #[prost(enumeration = "ChannelType", tag = "2")]
    pub kind: i32,
    #[prost(bool, optional, tag = "3")]
    pub persistence: Option<bool>,
    #[prost(bool, optional, tag = "4")]
    pub hidden: Option<bool>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelLeave {
    #[prost(string, tag = "1")]
    pub channel_id: String,
}

/// A chat message pushed to everyone in the channel.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessage {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
    #[prost(int32, tag = "3")]
    pub code: i32,
    #[prost(string, tag = "4")]
    pub sender_id: String,
    #[prost(string, tag = "5")]
    pub username: String,
    /// JSON object text.
    #[prost(string, tag = "6")]
    pub content: String,
    #[prost(int64, tag = "7")]
    pub create_time: i64,
    #[prost(int64, tag = "8")]
    pub update_time: i64,
    #[prost(bool, tag = "9")]
    pub persistent: bool,
    #[prost(string, tag = "10")]
    pub room_name: String,
    #[prost(string, tag = "11")]
    pub group_id: String,
    #[prost(string, tag = "12")]
    pub user_id_one: String,
    #[prost(string, tag = "13")]
    pub user_id_two: String,
}

/// Receipt for a sent, updated or removed chat message.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageAck {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
    #[prost(int32, tag = "3")]
    pub code: i32,
    #[prost(string, tag = "4")]
    pub username: String,
    #[prost(int64, tag = "5")]
    pub create_time: i64,
    #[prost(int64, tag = "6")]
    pub update_time: i64,
    #[prost(bool, tag = "7")]
    pub persistent: bool,
    #[prost(string, tag = "8")]
    pub room_name: String,
    #[prost(string, tag = "9")]
    pub group_id: String,
    #[prost(string, tag = "10")]
    pub user_id_one: String,
    #[prost(string, tag = "11")]
    pub user_id_two: String,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageSend {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub content: String,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageUpdate {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
    #[prost(string, tag = "3")]
    pub content: String,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMessageRemove {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub message_id: String,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPresenceEvent {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
    #[prost(string, tag = "4")]
    pub room_name: String,
    #[prost(string, tag = "5")]
    pub group_id: String,
    #[prost(string, tag = "6")]
    pub user_id_one: String,
    #[prost(string, tag = "7")]
    pub user_id_two: String,
}

// ---------------------------------------------------------------------------
// Realtime matches
// ---------------------------------------------------------------------------

/// A realtime match (reply to [`MatchCreate`] and [`MatchJoin`]).
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Match {
    #[prost(string, tag = "1")]
    pub match_id: String,
    /// `true` when the match is run by server-side logic.
    #[prost(bool, tag = "2")]
    pub authoritative: bool,
    #[prost(string, optional, tag = "3")]
    pub label: Option<String>,
    #[prost(int32, tag = "4")]
    pub size: i32,
    #[prost(message, repeated, tag = "5")]
    pub presences: Vec<UserPresence>,
    #[prost(message, optional, tag = "6")]
    pub self_presence: Option<UserPresence>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchCreate {}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchJoin {
    #[prost(map = "string, string", tag = "1")]
    pub metadata: HashMap<String, String>,
    #[prost(oneof = "MatchTarget", tags = "2, 3")]
    pub target: Option<MatchTarget>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchLeave {
    #[prost(string, tag = "1")]
    pub match_id: String,
}

/// Opaque game data relayed by a match.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchData {
    #[prost(string, tag = "1")]
    pub match_id: String,
    /// Sender; absent when the server itself produced the data.
    #[prost(message, optional, tag = "2")]
    pub presence: Option<UserPresence>,
    #[prost(int64, tag = "3")]
    pub op_code: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub reliable: bool,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchDataSend {
    #[prost(string, tag = "1")]
    pub match_id: String,
    #[prost(int64, tag = "2")]
    pub op_code: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub data: Vec<u8>,
    /// Restricts delivery to these presences; empty means everyone.
    #[prost(message, repeated, tag = "4")]
    pub presences: Vec<UserPresence>,
    #[prost(bool, tag = "5")]
    pub reliable: bool,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPresenceEvent {
    #[prost(string, tag = "1")]
    pub match_id: String,
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
}

// ---------------------------------------------------------------------------
// Matchmaker
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerAdd {
    #[prost(int32, tag = "1")]
    pub min_count: i32,
    #[prost(int32, tag = "2")]
    pub max_count: i32,
    #[prost(string, tag = "3")]
    pub query: String,
    #[prost(map = "string, string", tag = "4")]
    pub string_properties: HashMap<String, String>,
    #[prost(map = "string, double", tag = "5")]
    pub numeric_properties: HashMap<String, f64>,
}

/// A user the matchmaker placed in the same match.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerUser {
    #[prost(message, optional, tag = "1")]
    pub presence: Option<UserPresence>,
    #[prost(map = "string, string", tag = "2")]
    pub string_properties: HashMap<String, String>,
    #[prost(map = "string, double", tag = "3")]
    pub numeric_properties: HashMap<String, f64>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerMatched {
    #[prost(string, tag = "1")]
    pub ticket: String,
    #[prost(oneof = "MatchTarget", tags = "2, 3")]
    pub target: Option<MatchTarget>,
    #[prost(message, repeated, tag = "4")]
    pub users: Vec<MatchmakerUser>,
    #[prost(message, optional, tag = "5")]
    pub self_user: Option<MatchmakerUser>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerRemove {
    #[prost(string, tag = "1")]
    pub ticket: String,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakerTicket {
    #[prost(string, tag = "1")]
    pub ticket: String,
}

// ---------------------------------------------------------------------------
// Notifications, RPC, status, streams
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub subject: String,
    #[prost(string, tag = "3")]
    pub content: String,
    #[prost(int32, tag = "4")]
    pub code: i32,
    #[prost(string, tag = "5")]
    pub sender_id: String,
    #[prost(int64, tag = "6")]
    pub create_time: i64,
    #[prost(bool, tag = "7")]
    pub persistent: bool,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Notifications {
    #[prost(message, repeated, tag = "1")]
    pub notifications: Vec<Notification>,
}

/// A call to a server-side function. Used for both the request and the
/// reply; the reply's `payload` holds the function's result.
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Rpc {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub payload: String,
    #[prost(string, tag = "3")]
    pub http_key: String,
}

/// Presences of followed users (reply to [`StatusFollow`]).
#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    #[prost(message, repeated, tag = "1")]
    pub presences: Vec<UserPresence>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusFollow {
    #[prost(string, repeated, tag = "1")]
    pub user_ids: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub usernames: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusUnfollow {
    #[prost(string, repeated, tag = "1")]
    pub user_ids: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusUpdate {
    /// `None` appears offline to followers.
    #[prost(string, optional, tag = "1")]
    pub status: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPresenceEvent {
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamData {
    #[prost(message, optional, tag = "1")]
    pub stream: Option<Stream>,
    #[prost(message, optional, tag = "2")]
    pub sender: Option<UserPresence>,
    #[prost(string, tag = "3")]
    pub data: String,
    #[prost(bool, tag = "4")]
    pub reliable: bool,
}

#[derive(Clone, PartialEq, Eq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamPresenceEvent {
    #[prost(message, optional, tag = "1")]
    pub stream: Option<Stream>,
    #[prost(message, repeated, tag = "2")]
    pub joins: Vec<UserPresence>,
    #[prost(message, repeated, tag = "3")]
    pub leaves: Vec<UserPresence>,
}
