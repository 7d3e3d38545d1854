//! Fan-out of server pushes to subscribers.
//!
//! Each [`EventKind`] has its own list of subscribers. Publishing an event
//! hands a copy to every live subscriber of that kind, in publish order.
//! Subscribers that dropped their [`Subscription`] are pruned on the next
//! publish; a kind nobody listens to simply drops the event.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::Stream;
use rallypoint_protocol::{EventKind, FromPush, PushEvent};
use tokio::sync::{Mutex, mpsc};

use crate::DispatchError;

struct Inner {
    /// Indexed by [`EventKind::index`].
    subscribers: [Vec<mpsc::UnboundedSender<PushEvent>>; EventKind::ALL.len()],
    closed: bool,
}

/// Routes push events to per-kind subscribers.
///
/// Shared between the receive loop (which publishes) and application code
/// (which subscribes), so all methods take `&self`.
pub struct EventDispatcher {
    inner: Mutex<Inner>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                subscribers: std::array::from_fn(|_| Vec::new()),
                closed: false,
            }),
        }
    }

    /// Subscribes to every future push of type `E`.
    ///
    /// Events published before this call are not replayed.
    ///
    /// # Errors
    /// Returns [`DispatchError::Closed`] once the dispatcher has been closed.
    pub async fn subscribe<E: FromPush>(&self) -> Result<Subscription<E>, DispatchError> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(DispatchError::Closed);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        inner.subscribers[E::KIND.index()].push(tx);
        tracing::debug!(kind = %E::KIND, "subscribed to push events");

        Ok(Subscription {
            rx,
            _kind: PhantomData,
        })
    }

    /// Delivers `event` to every live subscriber of its kind.
    ///
    /// Returns how many subscribers received it.
    pub async fn publish(&self, event: PushEvent) -> usize {
        let kind = event.kind();
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return 0;
        }

        let subscribers = &mut inner.subscribers[kind.index()];
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());

        let delivered = subscribers.len();
        if delivered == 0 {
            tracing::trace!(%kind, "push event with no subscribers dropped");
        }
        delivered
    }

    /// Number of live subscribers for `kind`, as of the last publish.
    pub async fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner.lock().await.subscribers[kind.index()].len()
    }

    /// Closes the dispatcher. Every subscription ends after yielding the
    /// events it already received, and later subscribes fail.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        inner.closed = true;
        for list in &mut inner.subscribers {
            list.clear();
        }
    }
}

/// A stream of push events of one type.
///
/// Returned by [`EventDispatcher::subscribe`]. Use it with
/// [`StreamExt::next`](futures_util::StreamExt::next) or
/// [`Subscription::recv`]. The stream ends when the dispatcher closes.
/// Dropping it unsubscribes.
pub struct Subscription<E> {
    rx: mpsc::UnboundedReceiver<PushEvent>,
    _kind: PhantomData<fn() -> E>,
}

impl<E: FromPush> Subscription<E> {
    /// Waits for the next event. Returns `None` once the dispatcher closed.
    pub async fn recv(&mut self) -> Option<E> {
        while let Some(event) = self.rx.recv().await {
            if let Some(event) = E::from_push(event) {
                return Some(event);
            }
        }
        None
    }
}

impl<E: FromPush> Stream for Subscription<E> {
    type Item = E;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        let this = self.get_mut();
        loop {
            match ready!(this.rx.poll_recv(cx)) {
                Some(event) => {
                    if let Some(event) = E::from_push(event) {
                        return Poll::Ready(Some(event));
                    }
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
