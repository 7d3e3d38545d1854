//! The receive loop: one task per connection.
//!
//! The loop owns the read side of the socket. For its whole life it waits
//! on three things at once:
//!   1. The next inbound frame → decode, classify, route
//!   2. The keep-alive timer → send a ping
//!   3. The shutdown signal → stop
//!
//! When it stops, for any reason, it tears the connection down: the socket
//! is closed, subscriptions end, pending requests are failed, and the
//! disconnect hook runs. A panic in the hook is caught and logged.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use rallypoint_protocol::Inbound;
use rallypoint_transport::Connection;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::client::{CloseReason, ConnectionState, DisconnectHook, Shared};

pub(crate) async fn run_receiver<T: Connection>(
    shared: Arc<Shared<T>>,
    mut shutdown: oneshot::Receiver<()>,
    keep_alive: Duration,
    on_disconnect: Option<DisconnectHook>,
) {
    let conn_id = shared.conn.id();
    tracing::debug!(%conn_id, ?keep_alive, "receive loop started");

    let mut ticker = tokio::time::interval(keep_alive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let reason = loop {
        tokio::select! {
            // A dropped sender means every client handle is gone.
            _ = &mut shutdown => break CloseReason::Normal,

            frame = shared.conn.recv() => match frame {
                Ok(Some(data)) => route_frame(&shared, &data).await,
                Ok(None) => break CloseReason::Remote,
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "receive failed");
                    break CloseReason::Transport(e.to_string());
                }
            },

            _ = ticker.tick() => {
                if let Err(e) = shared.conn.ping().await {
                    tracing::warn!(%conn_id, error = %e, "keep-alive ping failed");
                    break CloseReason::Transport(e.to_string());
                }
                tracing::trace!(%conn_id, "keep-alive ping sent");
            }
        }
    };

    teardown(&shared, reason, on_disconnect).await;
}

/// Decodes one frame and hands it to the correlation table or the event
/// dispatcher. Bad frames are logged and dropped; they never end the loop.
async fn route_frame<T: Connection>(shared: &Shared<T>, data: &[u8]) {
    let conn_id = shared.conn.id();

    let envelope = match shared.codec.decode(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, len = data.len(), "discarding undecodable frame");
            return;
        }
    };

    match envelope.classify() {
        Ok(Inbound::Response { cid, reply }) => {
            let name = reply.name();
            if let Err(e) = shared.table.resolve(&cid, reply).await {
                tracing::warn!(%conn_id, %cid, reply = name, error = %e, "could not deliver response");
            }
        }
        Ok(Inbound::Push(event)) => {
            let kind = event.kind();
            let delivered = shared.events.publish(event).await;
            tracing::trace!(%conn_id, %kind, delivered, "push event published");
        }
        Ok(Inbound::ServerError(err)) => {
            tracing::warn!(%conn_id, code = err.code, message = %err.message, "uncorrelated server error");
        }
        Err(e) => {
            tracing::warn!(%conn_id, error = %e, "discarding unroutable envelope");
        }
    }
}

async fn teardown<T: Connection>(
    shared: &Shared<T>,
    reason: CloseReason,
    on_disconnect: Option<DisconnectHook>,
) {
    let conn_id = shared.conn.id();
    shared.state.send_replace(ConnectionState::Closing);

    if let Err(e) = shared.conn.close().await {
        tracing::debug!(%conn_id, error = %e, "socket close failed");
    }
    shared.events.close().await;
    let abandoned = shared.table.close().await;

    tracing::info!(%conn_id, %reason, abandoned, "connection closed");

    shared.reason.send_replace(Some(reason.clone()));
    if let Some(hook) = on_disconnect {
        // A panicking hook must not leave the client stuck in `Closing`.
        if panic::catch_unwind(AssertUnwindSafe(|| hook(reason))).is_err() {
            tracing::error!(%conn_id, "on_disconnect hook panicked");
        }
    }
    shared.state.send_replace(ConnectionState::Closed);
}
