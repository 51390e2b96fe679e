//! # Events emitted while loading embeddable content.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Load events**: orchestration flow (cache hit, content set, failure)
//! - **Transport events**: script and registry-slot lifecycle
//! - **Aggregation events**: task bookkeeping of the progress notification
//! - **Subscriber events**: delivery problems of subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! target URL, the registry key and a free-form reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use embedvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TransportFailed)
//!     .with_url("https://example.com/video")
//!     .with_key(7)
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::TransportFailed);
//! assert_eq!(ev.url.as_deref(), Some("https://example.com/video"));
//! assert_eq!(ev.key, Some(7));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of embed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Load events ===
    /// A cached response was found; delivery is scheduled for the next tick.
    ///
    /// Sets: `url`
    CacheHit,

    /// A provider request was handed to the transport.
    ///
    /// Sets: `url` (target), `key` (registry slot)
    RequestSent,

    /// Rendered markup was handed to the content sink.
    ///
    /// Sets: `url`
    ContentSet,

    /// A response hook suppressed `set_content` for this load.
    ///
    /// Sets: `url`
    ResponseSuppressed,

    /// A load ended on the error path.
    ///
    /// Sets: `url`, `reason`
    LoadFailed,

    // === Transport events ===
    /// An executable resource was injected.
    ///
    /// Sets: `url` (final request URL), `key`
    ScriptAttached,

    /// An injected resource was removed (after success or failure).
    ///
    /// Sets: `key`
    ScriptRemoved,

    /// A registry slot received its payload.
    ///
    /// Sets: `key`
    ResponseReceived,

    /// The injected resource failed to load.
    ///
    /// Sets: `url` (final request URL), `key`, `reason`
    TransportFailed,

    /// A resource invoked a slot that is unknown or already settled.
    ///
    /// Sets: `reason` (slot name)
    UnmatchedCallback,

    /// A resource executed without invoking its slot; the request stays pending.
    ///
    /// Sets: `url` (final request URL), `key`
    CallbackMissing,

    // === Aggregation events ===
    /// A fresh aggregator was created (previous one absent or finished).
    AggregatorCreated,

    /// A task was added to the current aggregator.
    ///
    /// Sets: `done`, `total`
    TaskCreated,

    /// A task reached `done`.
    ///
    /// Sets: `done`, `total`
    TaskDone,

    /// A task was cancelled.
    ///
    /// Sets: `done`, `total`
    TaskCanceled,

    /// Every task of the aggregator is settled. Fired once per aggregator.
    ///
    /// Sets: `done`, `total`
    AggregatorFinished,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason`
    SubscriberPanicked,
}

/// Embed event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Target or request URL, if applicable.
    pub url: Option<Arc<str>>,
    /// Callback registry key, if applicable.
    pub key: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Tasks settled as done in the current aggregator.
    pub done: Option<u32>,
    /// Live tasks in the current aggregator.
    pub total: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            url: None,
            key: None,
            reason: None,
            done: None,
            total: None,
        }
    }

    /// Attaches a URL.
    #[inline]
    pub fn with_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches a registry key.
    #[inline]
    pub fn with_key(mut self, key: u64) -> Self {
        self.key = Some(key);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches aggregator progress.
    #[inline]
    pub fn with_progress(mut self, done: u32, total: u32) -> Self {
        self.done = Some(done);
        self.total = Some(total);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::TaskCreated);
        let b = Event::new(EventKind::TaskDone);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn progress_sets_both_counters() {
        let ev = Event::new(EventKind::TaskDone).with_progress(2, 3);
        assert_eq!((ev.done, ev.total), (Some(2), Some(3)));
        assert!(!ev.is_subscriber_event());
    }
}
