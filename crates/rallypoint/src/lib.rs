//! # Rallypoint
//!
//! Realtime client for multiplayer game servers.
//!
//! One persistent socket carries everything: typed requests, each paired
//! with exactly its own reply no matter what order replies arrive in, and
//! unsolicited server pushes fanned out to typed subscription streams.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use rallypoint::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = Client::builder()
//!     .host("127.0.0.1")
//!     .port(7350)
//!     .connect("session-token")
//!     .await?;
//!
//! let mut messages = client.subscribe::<ChannelMessage>().await?;
//! let channel = client.join_channel("lobby", ChannelType::Room, false, false).await?;
//! println!("joined {}", channel.id);
//!
//! while let Some(message) = messages.next().await {
//!     println!("{}: {}", message.username, message.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - `rallypoint-protocol`: envelope, payload types, codecs
//! - `rallypoint-transport`: the [`Connection`](rallypoint_transport::Connection) trait and the WebSocket transport
//! - `rallypoint-dispatch`: correlation table and event dispatcher
//! - `rallypoint` (this crate): [`Client`], its builder, and the typed operations

mod api;
mod client;
mod config;
mod error;
mod receiver;

pub use api::MatchmakerRequest;
pub use client::{Client, ClientBuilder, CloseReason, ConnectionState};
pub use config::ClientConfig;
pub use error::ClientError;

pub use rallypoint_dispatch::{DispatchError, Subscription};
pub use rallypoint_protocol as protocol;
pub use rallypoint_transport as transport;

pub mod prelude {
    pub use crate::{
        Client, ClientBuilder, ClientConfig, ClientError, CloseReason, ConnectionState,
        MatchmakerRequest, Subscription,
    };
    pub use rallypoint_protocol::{
        Channel, ChannelMessage, ChannelMessageAck, ChannelPresenceEvent, ChannelType, Match,
        MatchData, MatchPresenceEvent, MatchmakerMatched, MatchmakerTicket, Notifications, Rpc,
        ServerError, Status, StatusPresenceEvent, StreamData, StreamPresenceEvent, UserPresence,
        WireFormat,
    };
}
