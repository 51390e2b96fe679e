//! # Host notification interface.
//!
//! The embedder never draws anything itself: progress and warnings go through a
//! [`Notifier`] supplied by the host (a toolbar balloon, a status line, a log...).
//! [`TracingNotifier`] is the default and writes through `tracing`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a shown notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NotificationId(u64);

impl NotificationId {
    /// Wraps a host-specific identifier.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Host-specific identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// What a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    /// Ongoing work with a progress value in `0.0..=1.0`.
    Progress,
    /// A non-blocking warning.
    Warning,
}

/// Host-side display of notifications.
pub trait Notifier: Send + Sync + 'static {
    /// Shows a new notification.
    fn show(&self, message: &str, kind: NotificationKind) -> NotificationId;

    /// Replaces the message and progress of a shown notification.
    fn update(&self, id: NotificationId, message: &str, progress: Option<f32>);

    /// Dismisses a notification.
    fn hide(&self, id: NotificationId);
}

/// Notifier writing through `tracing`.
#[derive(Debug, Default)]
pub struct TracingNotifier {
    next: AtomicU64,
}

impl TracingNotifier {
    /// Creates a notifier.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for TracingNotifier {
    fn show(&self, message: &str, kind: NotificationKind) -> NotificationId {
        let id = NotificationId(self.next.fetch_add(1, Ordering::Relaxed));
        match kind {
            NotificationKind::Progress => tracing::info!(id = id.0, "{message}"),
            NotificationKind::Warning => tracing::warn!(id = id.0, "{message}"),
        }
        id
    }

    fn update(&self, id: NotificationId, message: &str, progress: Option<f32>) {
        tracing::debug!(id = id.0, ?progress, "{message}");
    }

    fn hide(&self, id: NotificationId) {
        tracing::debug!(id = id.0, "notification hidden");
    }
}
