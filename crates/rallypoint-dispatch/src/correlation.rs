//! The correlation table: matching responses to the requests that caused
//! them.
//!
//! Every outgoing request reserves a [`Ticket`] first. The ticket's id,
//! written as a decimal string, becomes the envelope's `cid`. When the
//! receive loop sees a response carrying that cid it calls
//! [`CorrelationTable::resolve`], which wakes exactly that ticket.
//!
//! ```text
//! reserve(Match) ──→ id 0 ──→ send {cid:"0", match_create}
//! reserve(Channel) ─→ id 1 ──→ send {cid:"1", channel_join}
//!                                   ...
//! recv {cid:"1", channel} ──→ resolve("1") ──→ ticket 1 wakes
//! recv {cid:"0", match}   ──→ resolve("0") ──→ ticket 0 wakes
//! ```
//!
//! Responses may arrive in any order. Ids are never reused for the life
//! of the table, so a late or duplicated response can never wake the
//! wrong request.
//!
//! A ticket that is dropped before its response arrives (its caller was
//! cancelled) reports its id back to the table, and the entry is reaped
//! the next time the table is touched.

use std::collections::HashMap;

use rallypoint_protocol::{Reply, ReplyKind};
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::DispatchError;

/// What the waiting side of a ticket receives.
type Outcome = Result<Reply, DispatchError>;

/// A request that is waiting for its response.
struct Pending {
    kind: ReplyKind,
    tx: oneshot::Sender<Outcome>,
}

struct Inner {
    /// The id the next reservation will get. Everything below it has been
    /// issued at some point.
    next_id: u64,
    pending: HashMap<u64, Pending>,
    closed: bool,
    /// Ids of tickets dropped while still unresolved.
    dropped: mpsc::UnboundedReceiver<u64>,
}

impl Inner {
    /// Removes the entries of tickets nobody is waiting on any more.
    fn reap(&mut self) {
        while let Ok(id) = self.dropped.try_recv() {
            if self.pending.remove(&id).is_some() {
                tracing::trace!(id, "reaped ticket dropped by its caller");
            }
        }
    }
}

/// Tracks in-flight requests by correlation id.
///
/// One table belongs to one connection. It is shared between the callers
/// issuing requests and the receive loop resolving them, so all methods
/// take `&self`.
pub struct CorrelationTable {
    inner: Mutex<Inner>,
    dropped_tx: mpsc::UnboundedSender<u64>,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        let (dropped_tx, dropped) = mpsc::unbounded_channel();
        Self {
            inner: Mutex::new(Inner {
                next_id: 0,
                pending: HashMap::new(),
                closed: false,
                dropped,
            }),
            dropped_tx,
        }
    }

    /// Reserves a fresh correlation id for a request expecting `kind`.
    ///
    /// # Errors
    /// Returns [`DispatchError::Closed`] once the table has been closed.
    pub async fn reserve(&self, kind: ReplyKind) -> Result<Ticket, DispatchError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(DispatchError::Closed);
        }
        inner.reap();

        let id = inner.next_id;
        inner.next_id += 1;

        let (tx, rx) = oneshot::channel();
        inner.pending.insert(id, Pending { kind, tx });
        tracing::trace!(id, %kind, "reserved ticket");

        Ok(Ticket {
            id,
            kind,
            rx,
            settled: false,
            dropped: self.dropped_tx.clone(),
        })
    }

    /// Delivers `reply` to the ticket named by `cid`.
    ///
    /// The ticket is removed whatever happens next. If the reply has the
    /// wrong shape for what the request declared, the waiter receives
    /// [`DispatchError::UnexpectedReply`] and the same error is returned
    /// here so the receive loop can log it.
    ///
    /// # Errors
    /// - [`DispatchError::InvalidCorrelationId`] if `cid` is not a decimal
    ///   id in canonical form
    /// - [`DispatchError::UnknownTicket`] if the id was never issued
    /// - [`DispatchError::AlreadyResolved`] if the id is no longer pending
    /// - [`DispatchError::UnexpectedReply`] on a shape mismatch
    pub async fn resolve(&self, cid: &str, reply: Reply) -> Result<(), DispatchError> {
        let id = parse_cid(cid)?;

        let pending = {
            let mut inner = self.inner.lock().await;
            inner.reap();
            match inner.pending.remove(&id) {
                Some(pending) => pending,
                None if id < inner.next_id => return Err(DispatchError::AlreadyResolved(id)),
                None => return Err(DispatchError::UnknownTicket(id)),
            }
        };

        if reply.satisfies(pending.kind) {
            if pending.tx.send(Ok(reply)).is_err() {
                tracing::debug!(id, "reply arrived after its caller stopped waiting");
            }
            return Ok(());
        }

        let got = reply.name();
        let _ = pending.tx.send(Err(DispatchError::UnexpectedReply {
            id,
            expected: pending.kind,
            got,
        }));
        Err(DispatchError::UnexpectedReply {
            id,
            expected: pending.kind,
            got,
        })
    }

    /// Drops the pending entry for `id`, if any.
    ///
    /// Used when a request fails before its response can arrive (the send
    /// failed, or the caller timed out). A response that shows up later is
    /// reported as [`DispatchError::AlreadyResolved`].
    ///
    /// Returns `true` if the ticket was still pending.
    pub async fn abandon(&self, id: u64) -> bool {
        let mut inner = self.inner.lock().await;
        inner.reap();
        let removed = inner.pending.remove(&id).is_some();
        if removed {
            tracing::trace!(id, "abandoned ticket");
        }
        removed
    }

    /// Closes the table. Every pending ticket resolves to
    /// [`DispatchError::Abandoned`] and later reservations fail.
    ///
    /// Returns how many tickets were still pending.
    pub async fn close(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        inner.reap();
        let drained = inner.pending.len();
        // Dropping the senders wakes every waiter with `Abandoned`.
        inner.pending.clear();
        if drained > 0 {
            tracing::debug!(drained, "closed correlation table with requests in flight");
        }
        drained
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.reap();
        inner.pending.len()
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}

/// Parses a wire correlation id. Only the exact strings produced by
/// `u64::to_string` are accepted, so `"07"` and `"+7"` are rejected.
fn parse_cid(cid: &str) -> Result<u64, DispatchError> {
    cid.parse::<u64>()
        .ok()
        .filter(|id| id.to_string() == cid)
        .ok_or_else(|| DispatchError::InvalidCorrelationId(cid.to_string()))
}

/// A reserved correlation id and the means to wait for its response.
///
/// Returned by [`CorrelationTable::reserve`]. Dropping an unresolved
/// ticket, including dropping a [`wait`](Self::wait) future part way
/// through, releases its entry in the table.
#[derive(Debug)]
pub struct Ticket {
    id: u64,
    kind: ReplyKind,
    rx: oneshot::Receiver<Outcome>,
    /// Set once `rx` has produced a value; the table entry is gone by then.
    settled: bool,
    dropped: mpsc::UnboundedSender<u64>,
}

impl Ticket {
    /// The numeric correlation id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The id as it goes on the wire.
    pub fn cid(&self) -> String {
        self.id.to_string()
    }

    /// The reply kind this ticket was reserved for.
    pub fn kind(&self) -> ReplyKind {
        self.kind
    }

    /// Waits for the response.
    ///
    /// # Errors
    /// - [`DispatchError::UnexpectedReply`] if the response had the wrong
    ///   shape
    /// - [`DispatchError::Abandoned`] if the ticket was abandoned or the
    ///   table closed first
    pub async fn wait(mut self) -> Result<Reply, DispatchError> {
        let received = (&mut self.rx).await;
        self.settled = true;
        match received {
            Ok(outcome) => outcome,
            Err(_) => Err(DispatchError::Abandoned(self.id)),
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if !self.settled {
            // The table may already be gone.
            let _ = self.dropped.send(self.id);
        }
    }
}
