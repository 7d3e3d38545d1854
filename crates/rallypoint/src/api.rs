//! The typed operations a [`Client`] offers.
//!
//! Every operation follows the same path:
//!
//! ```text
//! validate args ──→ reserve ticket (declares ReplyKind)
//!               ──→ encode Envelope { cid, payload } ──→ send
//!               ──→ wait on ticket ──→ Reply ──→ typed result
//! ```
//!
//! Operations with nothing to return still wait for the server's empty
//! acknowledgement, so `Ok(())` means the server accepted the request.

use std::collections::HashMap;

use rallypoint_dispatch::DispatchError;
use rallypoint_protocol::{
    Channel, ChannelJoin, ChannelLeave, ChannelMessageAck, ChannelMessageRemove,
    ChannelMessageSend, ChannelMessageUpdate, ChannelType, Envelope, FromReply, Match,
    MatchCreate, MatchDataSend, MatchJoin, MatchLeave, MatchTarget, MatchmakerAdd,
    MatchmakerRemove, MatchmakerTicket, Message, Reply, Rpc, Status, StatusFollow,
    StatusUnfollow, StatusUpdate,
};
use rallypoint_transport::Connection;

use crate::{Client, ClientError};

// ---------------------------------------------------------------------------
// Matchmaker parameters
// ---------------------------------------------------------------------------

/// Parameters for [`Client::add_matchmaker`].
///
/// ```rust
/// use rallypoint::MatchmakerRequest;
///
/// let request = MatchmakerRequest::new(2)
///     .max_count(4)
///     .query("+properties.region:eu")
///     .string_property("region", "eu")
///     .numeric_property("skill", 1200.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MatchmakerRequest {
    min_count: i32,
    max_count: Option<i32>,
    query: String,
    string_properties: HashMap<String, String>,
    numeric_properties: HashMap<String, f64>,
}

impl MatchmakerRequest {
    /// Query that matches anyone.
    pub const ANY: &'static str = "*";

    /// A request for a match of at least `min_count` players.
    pub fn new(min_count: i32) -> Self {
        Self {
            min_count,
            max_count: None,
            query: String::new(),
            string_properties: HashMap::new(),
            numeric_properties: HashMap::new(),
        }
    }

    /// Upper bound on match size. Defaults to `min_count`.
    pub fn max_count(mut self, max_count: i32) -> Self {
        self.max_count = Some(max_count);
        self
    }

    /// Matchmaker query. Defaults to [`Self::ANY`].
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn string_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.string_properties.insert(key.into(), value.into());
        self
    }

    pub fn numeric_property(mut self, key: impl Into<String>, value: f64) -> Self {
        self.numeric_properties.insert(key.into(), value);
        self
    }

    /// Checks the counts and fills in defaults.
    fn into_message(self) -> Result<MatchmakerAdd, ClientError> {
        if self.min_count < 2 {
            return Err(ClientError::invalid(format!(
                "min_count must be at least 2, got {}",
                self.min_count
            )));
        }
        let max_count = self.max_count.unwrap_or(self.min_count);
        if max_count < self.min_count {
            return Err(ClientError::invalid(format!(
                "max_count ({max_count}) must be at least min_count ({})",
                self.min_count
            )));
        }
        let query = if self.query.is_empty() {
            Self::ANY.to_string()
        } else {
            self.query
        };
        Ok(MatchmakerAdd {
            min_count: self.min_count,
            max_count,
            query,
            string_properties: self.string_properties,
            numeric_properties: self.numeric_properties,
        })
    }
}

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

impl<T: Connection> Client<T> {
    /// Sends `message` and waits for a reply of type `R`.
    async fn request<R: FromReply>(&self, message: Message) -> Result<R, ClientError> {
        let shared = self.shared();
        if !shared.is_open() {
            return Err(ClientError::NotConnected);
        }

        let ticket = shared
            .table
            .reserve(R::KIND)
            .await
            .map_err(ClientError::from_dispatch)?;
        let id = ticket.id();
        let request = message.name();

        let frame = match shared.codec.encode(&Envelope::request(ticket.cid(), message)) {
            Ok(frame) => frame,
            Err(e) => {
                shared.table.abandon(id).await;
                return Err(e.into());
            }
        };
        if let Err(e) = shared.conn.send(&frame).await {
            shared.table.abandon(id).await;
            return Err(e.into());
        }
        tracing::debug!(cid = id, request, expects = %R::KIND, "request sent");

        let outcome = match shared.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, ticket.wait()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    shared.table.abandon(id).await;
                    tracing::debug!(cid = id, request, ?limit, "request timed out");
                    return Err(ClientError::Timeout(limit));
                }
            },
            None => ticket.wait().await,
        };

        match outcome.map_err(ClientError::from_dispatch)? {
            Reply::Error(err) => Err(ClientError::Server(err)),
            reply => {
                let got = reply.name();
                R::from_reply(reply).ok_or(ClientError::Dispatch(DispatchError::UnexpectedReply {
                    id,
                    expected: R::KIND,
                    got,
                }))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Sets this user's status as seen by followers. `None` appears offline.
    pub async fn update_status(&self, status: Option<&str>) -> Result<(), ClientError> {
        self.request(Message::StatusUpdate(StatusUpdate {
            status: status.map(str::to_string),
        }))
        .await
    }

    /// Follows users by id and/or username and returns their current
    /// presences.
    ///
    /// # Errors
    /// [`ClientError::InvalidArgument`] if both lists are empty.
    pub async fn follow_users(
        &self,
        user_ids: &[&str],
        usernames: &[&str],
    ) -> Result<Status, ClientError> {
        if user_ids.is_empty() && usernames.is_empty() {
            return Err(ClientError::invalid(
                "follow_users needs at least one user id or username",
            ));
        }
        self.request(Message::StatusFollow(StatusFollow {
            user_ids: to_strings(user_ids),
            usernames: to_strings(usernames),
        }))
        .await
    }

    pub async fn unfollow_users(&self, user_ids: &[&str]) -> Result<(), ClientError> {
        self.request(Message::StatusUnfollow(StatusUnfollow {
            user_ids: to_strings(user_ids),
        }))
        .await
    }

    // -----------------------------------------------------------------------
    // Matches
    // -----------------------------------------------------------------------

    /// Creates a relayed match and joins it.
    pub async fn create_match(&self) -> Result<Match, ClientError> {
        self.request(Message::MatchCreate(MatchCreate {})).await
    }

    /// Joins a match by id.
    pub async fn join_match(&self, match_id: &str) -> Result<Match, ClientError> {
        self.request(Message::MatchJoin(MatchJoin {
            metadata: HashMap::new(),
            target: Some(MatchTarget::MatchId(match_id.to_string())),
        }))
        .await
    }

    /// Joins the match the matchmaker placed this user in, using the token
    /// from a [`MatchmakerMatched`](rallypoint_protocol::MatchmakerMatched)
    /// event.
    pub async fn join_match_by_token(&self, token: &str) -> Result<Match, ClientError> {
        self.request(Message::MatchJoin(MatchJoin {
            metadata: HashMap::new(),
            target: Some(MatchTarget::Token(token.to_string())),
        }))
        .await
    }

    pub async fn leave_match(&self, match_id: &str) -> Result<(), ClientError> {
        self.request(Message::MatchLeave(MatchLeave {
            match_id: match_id.to_string(),
        }))
        .await
    }

    /// Sends game data to everyone in a match. Delivery is reliable and the
    /// call returns once the server acknowledged it.
    pub async fn send_match_data(
        &self,
        match_id: &str,
        op_code: i64,
        data: &[u8],
    ) -> Result<(), ClientError> {
        self.request(Message::MatchDataSend(MatchDataSend {
            match_id: match_id.to_string(),
            op_code,
            data: data.to_vec(),
            presences: Vec::new(),
            reliable: true,
        }))
        .await
    }

    // -----------------------------------------------------------------------
    // Matchmaker
    // -----------------------------------------------------------------------

    /// Joins the matchmaker pool.
    ///
    /// # Errors
    /// [`ClientError::InvalidArgument`] if `min_count < 2` or
    /// `max_count < min_count`. Nothing is sent in that case.
    pub async fn add_matchmaker(
        &self,
        request: MatchmakerRequest,
    ) -> Result<MatchmakerTicket, ClientError> {
        let add = request.into_message()?;
        self.request(Message::MatchmakerAdd(add)).await
    }

    pub async fn remove_matchmaker(&self, ticket: &str) -> Result<(), ClientError> {
        self.request(Message::MatchmakerRemove(MatchmakerRemove {
            ticket: ticket.to_string(),
        }))
        .await
    }

    // -----------------------------------------------------------------------
    // RPC
    // -----------------------------------------------------------------------

    /// Calls the server function `id` with an optional string payload and
    /// returns its result.
    ///
    /// # Errors
    /// [`ClientError::InvalidArgument`] if `id` is empty.
    pub async fn rpc(&self, id: &str, payload: Option<&str>) -> Result<Rpc, ClientError> {
        if id.is_empty() {
            return Err(ClientError::invalid("rpc id must not be empty"));
        }
        self.request(Message::Rpc(Rpc {
            id: id.to_string(),
            payload: payload.unwrap_or_default().to_string(),
            http_key: String::new(),
        }))
        .await
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Joins a chat channel.
    ///
    /// `target` is a room name, a group id, or the other user's id for
    /// [`ChannelType::Room`], [`ChannelType::Group`] and
    /// [`ChannelType::DirectMessage`] respectively.
    ///
    /// # Errors
    /// [`ClientError::InvalidArgument`] if `target` is empty or `kind` is
    /// [`ChannelType::Unspecified`].
    pub async fn join_channel(
        &self,
        target: &str,
        kind: ChannelType,
        persistence: bool,
        hidden: bool,
    ) -> Result<Channel, ClientError> {
        if target.is_empty() {
            return Err(ClientError::invalid("channel target must not be empty"));
        }
        if kind == ChannelType::Unspecified {
            return Err(ClientError::invalid("channel type must be specified"));
        }
        self.request(Message::ChannelJoin(ChannelJoin {
            target: target.to_string(),
            kind: kind as i32,
            persistence: Some(persistence),
            hidden: Some(hidden),
        }))
        .await
    }

    pub async fn leave_channel(&self, channel_id: &str) -> Result<(), ClientError> {
        self.request(Message::ChannelLeave(ChannelLeave {
            channel_id: channel_id.to_string(),
        }))
        .await
    }

    /// Posts a message to a channel. `content` travels as a JSON object.
    pub async fn send_channel_message(
        &self,
        channel_id: &str,
        content: &HashMap<String, String>,
    ) -> Result<ChannelMessageAck, ClientError> {
        let content = serde_json::to_string(content)?;
        self.request(Message::ChannelMessageSend(ChannelMessageSend {
            channel_id: channel_id.to_string(),
            content,
        }))
        .await
    }

    /// Replaces the content of a message this user sent earlier.
    pub async fn update_channel_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &HashMap<String, String>,
    ) -> Result<ChannelMessageAck, ClientError> {
        let content = serde_json::to_string(content)?;
        self.request(Message::ChannelMessageUpdate(ChannelMessageUpdate {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            content,
        }))
        .await
    }

    pub async fn remove_channel_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<ChannelMessageAck, ClientError> {
        self.request(Message::ChannelMessageRemove(ChannelMessageRemove {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        }))
        .await
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
