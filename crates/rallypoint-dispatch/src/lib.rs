//! Routing of inbound traffic for Rallypoint.
//!
//! Everything the server sends falls into one of two buckets, and this
//! crate has one piece for each:
//!
//! 1. **Responses** go back to the exact request that caused them
//!    ([`CorrelationTable`] hands out [`Ticket`]s and resolves them by
//!    correlation id)
//! 2. **Pushes** go to whoever subscribed to that kind of event
//!    ([`EventDispatcher`] hands out [`Subscription`] streams)
//!
//! # How it fits in the stack
//!
//! ```text
//! Client / RPC façade (above)  ← reserves tickets, subscribes to events
//!     ↕
//! Dispatch Layer (this crate)  ← fed by the receive loop
//!     ↕
//! Protocol Layer (below)  ← provides Reply, PushEvent and their kinds
//! ```

mod correlation;
mod error;
mod events;

pub use correlation::{CorrelationTable, Ticket};
pub use error::DispatchError;
pub use events::{EventDispatcher, Subscription};
