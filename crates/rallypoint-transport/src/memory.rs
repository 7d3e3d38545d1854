//! In-process transport backed by Tokio channels.
//!
//! [`MemoryConnection::pair`] returns the client end of a connection and a
//! [`MemoryPeer`] that plays the server: it reads what the client sent and
//! writes frames back, in any order it likes. Nothing touches the network,
//! so tests that need precise control over ordering stay deterministic.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, TransportError};

/// What the peer can put on the client's inbound side.
enum Inbound {
    Frame(Vec<u8>),
    Fail(String),
}

/// Client end of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    pings: Arc<AtomicU64>,
}

/// Server end of an in-memory connection.
///
/// Dropping the peer closes the connection cleanly: the client's next
/// `recv` returns `Ok(None)`.
pub struct MemoryPeer {
    to_client: mpsc::UnboundedSender<Inbound>,
    from_client: mpsc::UnboundedReceiver<Vec<u8>>,
    pings: Arc<AtomicU64>,
}

impl MemoryConnection {
    /// Creates a connected client/peer pair.
    pub fn pair() -> (MemoryConnection, MemoryPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let pings = Arc::new(AtomicU64::new(0));

        let conn = MemoryConnection {
            id: ConnectionId::next(),
            outbound: Mutex::new(Some(out_tx)),
            inbound: Mutex::new(in_rx),
            pings: Arc::clone(&pings),
        };
        let peer = MemoryPeer {
            to_client: in_tx,
            from_client: out_rx,
            pings,
        };
        (conn, peer)
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let outbound = self.outbound.lock().await;
        let Some(tx) = outbound.as_ref() else {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        };
        tx.send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.inbound.lock().await.recv().await {
            Some(Inbound::Frame(data)) => Ok(Some(data)),
            Some(Inbound::Fail(reason)) => {
                Err(TransportError::ReceiveFailed(io::Error::other(reason)))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), TransportError> {
        if self.outbound.lock().await.is_none() {
            return Err(TransportError::ConnectionClosed("closed locally".into()));
        }
        self.pings.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.outbound.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl MemoryPeer {
    /// Delivers one frame to the client. Returns `false` if the client end
    /// is gone.
    pub fn send(&self, data: impl Into<Vec<u8>>) -> bool {
        self.to_client.send(Inbound::Frame(data.into())).is_ok()
    }

    /// Makes the client's next `recv` fail with a transport error.
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self.to_client.send(Inbound::Fail(reason.into()));
    }

    /// Waits for the next frame the client sent.
    ///
    /// Returns `None` once the client has closed its end.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_client.recv().await
    }

    /// Number of keep-alive pings the client has sent so far.
    pub fn pings(&self) -> u64 {
        self.pings.load(Ordering::Relaxed)
    }
}
