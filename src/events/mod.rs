//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the embedder, the JSONP transport
//! and the task aggregator.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Embedder` (cache/content/failure), `JsonpTransport`
//!   (script and slot lifecycle), `Aggregator` (task bookkeeping),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the builder-spawned listener that fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
