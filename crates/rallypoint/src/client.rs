//! `Client` builder and connection lifecycle.
//!
//! This is the entry point for talking to a game server. It ties together
//! all the layers: transport → protocol → dispatch, and owns the single
//! receive loop that feeds the dispatch layer.
//!
//! ## Lifecycle
//!
//! ```text
//! connect() ──→ [Open] ──→ close() ──→ [Closing] ──→ [Closed]
//!                  │                                    ▲
//!                  └──── peer closes / socket fails ────┘
//! ```
//!
//! Reaching `Closed` ends every subscription stream, fails every request
//! still waiting for a reply, and runs the `on_disconnect` hook once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rallypoint_dispatch::{CorrelationTable, EventDispatcher, Subscription};
use rallypoint_protocol::{Codec, FromPush, WireFormat};
use rallypoint_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::{Mutex, oneshot, watch};

use crate::receiver::run_receiver;
use crate::{ClientConfig, ClientError};

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Requests can be sent.
    Open,
    /// [`Client::close`] was called; teardown is in progress.
    Closing,
    /// The socket is gone. Terminal.
    Closed,
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The application called [`Client::close`] (or dropped every handle).
    Normal,
    /// The server closed the socket cleanly.
    Remote,
    /// The socket failed.
    Transport(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("closed by client"),
            Self::Remote => f.write_str("closed by server"),
            Self::Transport(reason) => write!(f, "transport failure: {reason}"),
        }
    }
}

pub(crate) type DisconnectHook = Box<dyn FnOnce(CloseReason) + Send + 'static>;

/// State shared between client handles and the receive loop.
pub(crate) struct Shared<T> {
    pub(crate) conn: T,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) table: CorrelationTable,
    pub(crate) events: EventDispatcher,
    pub(crate) state: watch::Sender<ConnectionState>,
    pub(crate) reason: watch::Sender<Option<CloseReason>>,
    pub(crate) request_timeout: Option<Duration>,
}

impl<T> Shared<T> {
    pub(crate) fn is_open(&self) -> bool {
        *self.state.borrow() == ConnectionState::Open
    }
}

/// Owned by client handles only. Dropping the last handle drops the
/// shutdown sender, which stops the receive loop.
struct Handle<T> {
    shared: Arc<Shared<T>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

/// Builder for configuring and opening a [`Client`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use rallypoint::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let client = Client::builder()
///     .host("game.example.com")
///     .ssl(true)
///     .request_timeout(Duration::from_secs(10))
///     .on_disconnect(|reason| eprintln!("disconnected: {reason}"))
///     .connect("session-token")
///     .await?;
///
/// let created = client.create_match().await?;
/// println!("match {}", created.match_id);
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    on_disconnect: Option<DisconnectHook>,
}

impl ClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    /// Creates a builder starting from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            on_disconnect: None,
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn ssl(mut self, ssl: bool) -> Self {
        self.config.ssl = ssl;
        self
    }

    /// Sets the keep-alive ping interval.
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.config.keep_alive_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Bounds how long each request waits for its reply.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms =
            Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the envelope encoding.
    pub fn format(mut self, format: WireFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Registers a callback that runs exactly once when the connection ends,
    /// whatever the cause.
    ///
    /// It runs on the receive loop's task, after every pending request has
    /// been failed and every subscription has ended. Keep it short.
    pub fn on_disconnect(mut self, hook: impl FnOnce(CloseReason) + Send + 'static) -> Self {
        self.on_disconnect = Some(Box::new(hook));
        self
    }

    /// Returns the configuration as it stands.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Opens a WebSocket to the configured server, authenticating with
    /// `token`, and starts the receive loop.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the socket cannot be opened.
    pub async fn connect(self, token: &str) -> Result<Client, ClientError> {
        let config = self.config.clone().validated();
        tracing::info!(
            host = %config.host,
            port = config.port,
            ssl = config.ssl,
            format = %config.format,
            "connecting"
        );
        let conn = WebSocketConnection::connect(&config.url(token)).await?;
        Ok(self.connect_with(conn))
    }

    /// Starts a client over an already-open connection.
    ///
    /// The connection must already speak the configured wire format. Must
    /// be called from within a Tokio runtime.
    pub fn connect_with<T: Connection>(self, conn: T) -> Client<T> {
        let config = self.config.validated();
        let conn_id = conn.id();

        let shared = Arc::new(Shared {
            conn,
            codec: config.format.codec(),
            table: CorrelationTable::new(),
            events: EventDispatcher::new(),
            state: watch::Sender::new(ConnectionState::Open),
            reason: watch::Sender::new(None),
            request_timeout: config.request_timeout(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(run_receiver(
            Arc::clone(&shared),
            shutdown_rx,
            config.keep_alive(),
            self.on_disconnect,
        ));
        tracing::info!(%conn_id, "client connected");

        Client {
            handle: Arc::new(Handle {
                shared,
                shutdown: Mutex::new(Some(shutdown_tx)),
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected client.
///
/// Cheap to clone: every clone talks over the same socket. Requests from
/// any number of tasks may be in flight at once; each one gets exactly its
/// own reply.
///
/// The connection stays up until [`close`](Self::close) is called, the
/// server goes away, or the last handle is dropped.
pub struct Client<T: Connection = WebSocketConnection> {
    handle: Arc<Handle<T>>,
}

impl<T: Connection> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
        }
    }
}

impl Client {
    /// Creates a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<T: Connection> Client<T> {
    pub(crate) fn shared(&self) -> &Shared<T> {
        &self.handle.shared
    }

    /// The underlying connection's id, for correlating logs.
    pub fn connection_id(&self) -> ConnectionId {
        self.shared().conn.id()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.shared().state.borrow()
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_requests(&self) -> usize {
        self.shared().table.pending_count().await
    }

    /// Subscribes to every future push event of type `E`.
    ///
    /// ```rust,no_run
    /// # use rallypoint::prelude::*;
    /// # use futures_util::StreamExt;
    /// # async fn run(client: Client) -> Result<(), ClientError> {
    /// let mut data = client.subscribe::<MatchData>().await?;
    /// while let Some(event) = data.next().await {
    ///     println!("op {} from {}", event.op_code, event.match_id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`ClientError::NotConnected`] once the connection has closed.
    pub async fn subscribe<E: FromPush>(&self) -> Result<Subscription<E>, ClientError> {
        self.shared()
            .events
            .subscribe::<E>()
            .await
            .map_err(ClientError::from_dispatch)
    }

    /// Closes the connection and waits for teardown to finish.
    ///
    /// Idempotent: later or concurrent calls wait for the same teardown.
    /// When this returns, every subscription has ended, every pending
    /// request has failed with [`ClientError::NotConnected`], and the
    /// `on_disconnect` hook has run.
    pub async fn close(&self) {
        if let Some(shutdown) = self.handle.shutdown.lock().await.take() {
            self.shared().state.send_if_modified(|state| {
                let open = *state == ConnectionState::Open;
                if open {
                    *state = ConnectionState::Closing;
                }
                open
            });
            // The loop may already be gone if the server closed first.
            let _ = shutdown.send(());
        }
        self.closed().await;
    }

    /// Waits until the connection has ended, for whatever reason, and
    /// returns why.
    pub async fn closed(&self) -> CloseReason {
        let mut state = self.shared().state.subscribe();
        // The sender lives in `Shared`, which this handle keeps alive.
        let _ = state.wait_for(|s| *s == ConnectionState::Closed).await;
        self.shared()
            .reason
            .borrow()
            .clone()
            .unwrap_or(CloseReason::Normal)
    }
}
