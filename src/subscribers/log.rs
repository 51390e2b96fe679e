//! # LogWriter — event logger
//!
//! A minimal subscriber that writes incoming [`Event`]s through `tracing`.
//! Install a `tracing` subscriber in the host to see the output.
//!
//! ## Example output
//! ```text
//! INFO  [request-sent] url=https://youtu.be/x key=3
//! DEBUG [script-attached] src=https://p/oembed?url=...&callback=embedCallbacks%5B3%5D key=3
//! INFO  [content-set] url=https://youtu.be/x
//! WARN  [transport-failed] src=... key=4 err="status: 404"
//! INFO  [aggregator-finished] done=2 total=2
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let tag = tag(e.kind);
        let url = e.url.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let key = or_dash(e.key);
        match e.kind {
            EventKind::CacheHit | EventKind::ContentSet | EventKind::ResponseSuppressed => {
                tracing::info!("[{tag}] url={url}");
            }
            EventKind::RequestSent => tracing::info!("[{tag}] url={url} key={key}"),
            EventKind::LoadFailed => tracing::warn!("[{tag}] url={url} err={reason:?}"),
            EventKind::ScriptAttached => tracing::debug!("[{tag}] src={url} key={key}"),
            EventKind::ScriptRemoved | EventKind::ResponseReceived => {
                tracing::debug!("[{tag}] key={key}");
            }
            EventKind::TransportFailed => {
                tracing::warn!("[{tag}] src={url} key={key} err={reason:?}");
            }
            EventKind::UnmatchedCallback => tracing::debug!("[{tag}] slot={reason}"),
            EventKind::CallbackMissing => tracing::warn!("[{tag}] src={url} key={key}"),
            EventKind::AggregatorCreated => tracing::debug!("[{tag}]"),
            EventKind::TaskCreated | EventKind::TaskDone | EventKind::TaskCanceled => {
                tracing::debug!("[{tag}] done={} total={}", or_dash(e.done), or_dash(e.total));
            }
            EventKind::AggregatorFinished => {
                tracing::info!("[{tag}] done={} total={}", or_dash(e.done), or_dash(e.total));
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!("[{tag}] {reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

fn tag(kind: EventKind) -> &'static str {
    match kind {
        EventKind::CacheHit => "cache-hit",
        EventKind::RequestSent => "request-sent",
        EventKind::ContentSet => "content-set",
        EventKind::ResponseSuppressed => "response-suppressed",
        EventKind::LoadFailed => "load-failed",
        EventKind::ScriptAttached => "script-attached",
        EventKind::ScriptRemoved => "script-removed",
        EventKind::ResponseReceived => "response-received",
        EventKind::TransportFailed => "transport-failed",
        EventKind::UnmatchedCallback => "unmatched-callback",
        EventKind::CallbackMissing => "callback-missing",
        EventKind::AggregatorCreated => "aggregator-created",
        EventKind::TaskCreated => "task-created",
        EventKind::TaskDone => "task-done",
        EventKind::TaskCanceled => "task-canceled",
        EventKind::AggregatorFinished => "aggregator-finished",
        EventKind::SubscriberOverflow => "subscriber-overflow",
        EventKind::SubscriberPanicked => "subscriber-panicked",
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
