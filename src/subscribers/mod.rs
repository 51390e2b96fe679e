//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the fan-out [`SubscriberSet`]
//! and (with the `logging` feature) the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//!   Embedder / Transport / Aggregator ── publish(Event) ──► Bus
//!                                                            │
//!                                                 listener (spawned at build)
//!                                                            │
//!                                                     SubscriberSet::emit
//!                                                 ┌──────────┼──────────┐
//!                                                 ▼          ▼          ▼
//!                                             LogWriter   Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use embedvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::LoadFailed {
//!             // increment failure counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failure-counter"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
